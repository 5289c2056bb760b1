//! Wire protocol between surfaces and the hub.
//!
//! All frames are JSON text messages over the IPC WebSocket. The protocol is
//! a closed set of message kinds - every inbound frame deserializes into
//! [`ClientFrame`] and every outbound frame into [`SurfaceFrame`], so dispatch
//! is an exhaustive `match` rather than string-keyed lookup.
//!
//! # Wire contract
//!
//! The envelope field names are the contract shared with surface processes:
//!
//! - Request: `{id, method, params: {resource, args}}`
//! - Response: `{id, result?, error?}`
//! - Mutation broadcast: `{origin, mutation}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FormatResult};
use uuid::Uuid;

/// Opaque unique identifier for a surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SurfaceId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

/// Role a surface declares when attaching to the hub.
///
/// Exactly one surface should attach as `Worker` and one as `Primary`.
/// The role drives close interception (see the shutdown coordinator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceRole {
    /// The single background process holding authoritative state.
    Worker,
    /// The surface owning the real shutdown entry point.
    Primary,
    /// A surface that redirects close requests to the primary.
    Secondary,
    /// Auxiliary surfaces with no close interception.
    Other,
}

/// Lifecycle state of a registered surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceLifecycle {
    Created,
    Ready,
    Closing,
    Closed,
}

/// Whether the caller of a request stalls until the response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallerMode {
    Blocking,
    NonBlocking,
}

/// Parameters of an RPC request: target resource plus ordered arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestParams {
    pub resource: String,
    pub args: Vec<Value>,
}

/// RPC request envelope, correlated with its response by `id`.
///
/// Ids are caller-generated and must be collision-free; at most one pending
/// request exists per id at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub method: String,
    pub params: RequestParams,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, resource: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params: RequestParams {
                resource: resource.into(),
                args,
            },
        }
    }
}

/// RPC response envelope: either a result payload or an error payload.
///
/// Transient - consumed exactly once by the request broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    pub fn result(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, error: Value) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }
}

/// Verdict returned to a surface asking whether it may close.
///
/// Window management is host-side; the hub only decides. `VetoAndHide` tells
/// the host to keep the window alive and hide it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseDecision {
    Allow,
    Veto,
    VetoAndHide,
}

/// Frames sent from a surface to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Handshake - must be the first frame on every connection.
    Attach { id: SurfaceId, role: SurfaceRole },

    /// RPC call routed to the worker.
    Call {
        mode: CallerMode,
        #[serde(flatten)]
        request: RequestEnvelope,
    },

    /// RPC response from the worker for a pending request.
    Response {
        #[serde(flatten)]
        response: ResponseEnvelope,
    },

    /// Fire-and-forget broadcast; no response is expected.
    Message { payload: Value },

    /// Subscribe this surface to authoritative state.
    Subscribe,

    /// Worker signal: initialization finished (one-shot).
    BootComplete,

    /// Incremental state-change event to fan out to subscribers.
    Mutation { mutation: Value },

    /// The host received a close request for this surface and asks the hub
    /// for a verdict before letting the window close.
    CloseRequested,

    /// Relaunch the application after an orderly shutdown.
    Restart,

    /// Worker acknowledges the shutdown notice.
    ShutdownAck,

    /// Worker finished its shutdown work.
    ShutdownComplete,
}

/// Frames sent from the hub to a surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceFrame {
    /// Handshake reply.
    Attached {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// RPC request forwarded to the worker.
    Request {
        #[serde(flatten)]
        request: RequestEnvelope,
    },

    /// RPC response delivered back to the calling surface.
    Response {
        #[serde(flatten)]
        response: ResponseEnvelope,
    },

    /// Fire-and-forget broadcast payload.
    Message { payload: Value },

    /// Worker initialization finished.
    InitFinished,

    /// Ask the worker to push a full state snapshot to `surfaceId`.
    #[serde(rename_all = "camelCase")]
    SnapshotPush { surface_id: SurfaceId },

    /// State mutation fan-out; `origin` is the emitting surface.
    Mutation { origin: SurfaceId, mutation: Value },

    /// Graceful shutdown notice to the worker.
    ShutdownNotice,

    /// Unconditional close command (forced or post-completion path).
    ForceClose,

    /// Close request redirected to this surface (always the primary).
    CloseRequest,

    /// Verdict for a `closeRequested` frame.
    CloseDecision { decision: CloseDecision },

    /// Protocol-level error report; the connection stays open.
    Error { message: String },
}
