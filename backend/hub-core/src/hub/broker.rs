//! Request broker: RPC forwarding and response correlation.
//!
//! Every call from a surface is forwarded to the worker and tracked in a
//! pending map keyed by request id. The matching response resolves the entry
//! exactly once; late or duplicate responses are dropped and logged. A pending
//! entry that never resolves is bounded by a per-request timeout driven from
//! the hub actor rather than left to leak.

use crate::error::hub::HubError;
use crate::hub::registry::SurfaceRegistry;
use crate::proto::{RequestEnvelope, ResponseEnvelope, SurfaceFrame, SurfaceId};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;

use log::{debug, error, warn};
use serde_json::json;
use tokio::sync::oneshot;

/// Where a pending request's response must be delivered.
pub enum PendingCaller {
    /// The calling context is stalled awaiting this oneshot.
    Blocking(oneshot::Sender<ResponseEnvelope>),
    /// The response is pushed asynchronously to the origin surface.
    NonBlocking(SurfaceId),
}

struct PendingEntry {
    caller: PendingCaller,
    method: String,
}

/// Forwards calls to the worker and correlates responses back by id.
#[derive(Default)]
pub struct RequestBroker {
    pending: HashMap<String, PendingEntry>,
}

impl RequestBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests still awaiting a response.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a request with this id is still awaiting a response.
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Forward `request` to the worker and register a pending entry.
    ///
    /// A forwarding failure (worker absent or destroyed) is terminal for the
    /// request but does not remove the entry - it stays until the per-request
    /// timeout fires or the process shuts down. No retry is ever attempted.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::DuplicateRequest`] when an entry with the same id
    /// is already pending; the caller is not registered in that case.
    pub fn send(
        &mut self,
        registry: &SurfaceRegistry,
        request: RequestEnvelope,
        caller: PendingCaller,
    ) -> Result<(), HubError> {
        if self.pending.contains_key(&request.id) {
            return Err(HubError::DuplicateRequest {
                message: format!("request id {} already pending", request.id),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let id = request.id.clone();
        let method = request.method.clone();
        debug!("Forwarding request {id} ({method}) to worker");

        let forwarded = match registry.worker_id() {
            Some(worker) => registry.send_to(&worker, SurfaceFrame::Request { request }),
            None => false,
        };
        if !forwarded {
            error!("Failed to forward request {id} ({method}): worker unreachable");
        }

        self.pending.insert(id, PendingEntry { caller, method });
        Ok(())
    }

    /// Resolve the pending entry matching `response`, exactly once.
    ///
    /// A response with no pending entry (duplicate or already expired) is
    /// dropped and logged; it is not an error surfaced to any caller.
    pub fn on_response(&mut self, registry: &SurfaceRegistry, response: ResponseEnvelope) {
        let Some(entry) = self.pending.remove(&response.id) else {
            warn!(
                "Dropping response with no pending request (id {})",
                response.id
            );
            return;
        };

        debug!("Resolving request {} ({})", response.id, entry.method);
        Self::deliver(registry, entry, response);
    }

    /// Expire a pending request whose bound elapsed without a response.
    ///
    /// The caller receives a definite timeout error. If the entry resolved in
    /// the meantime this is a no-op.
    pub fn expire(&mut self, registry: &SurfaceRegistry, id: &str) {
        let Some(entry) = self.pending.remove(id) else {
            return;
        };

        warn!("Request {id} ({}) timed out without a response", entry.method);
        let response = ResponseEnvelope::error(id, json!("request timed out"));
        Self::deliver(registry, entry, response);
    }

    /// Fire-and-forget broadcast: forwarded to every surface except the
    /// worker and the originating surface. No pending entry is created.
    pub fn on_message(&self, registry: &SurfaceRegistry, origin: &SurfaceId, payload: serde_json::Value) {
        let worker = registry.worker_id();
        let mut exclude = vec![origin];
        if let Some(ref worker) = worker {
            exclude.push(worker);
        }
        registry.broadcast(&SurfaceFrame::Message { payload }, &exclude);
    }

    fn deliver(registry: &SurfaceRegistry, entry: PendingEntry, response: ResponseEnvelope) {
        match entry.caller {
            PendingCaller::Blocking(tx) => {
                if tx.send(response).is_err() {
                    warn!("Blocking caller went away before its response arrived");
                }
            }
            PendingCaller::NonBlocking(origin) => {
                if !registry.send_to(&origin, SurfaceFrame::Response { response }) {
                    warn!("Origin surface {origin} unreachable; dropping response");
                }
            }
        }
    }
}
