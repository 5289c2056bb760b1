//! Test helpers for hub integration tests.
//!
//! Utilities for standing up a hub + IPC gateway pair and speaking the JSON
//! frame protocol as a surface process would:
//! - Starting a gateway on an ephemeral port
//! - Attaching surfaces with a given id and role
//! - Sending/receiving frames with timeouts
//! - Recording host-hook invocations without tearing down the test process

use hub_core::config::HubConfig;
use hub_core::hub::{HostHooks, HubHandle, start_hub};
use hub_core::ipc::start_ipc_server;
use hub_core::proto::{ClientFrame, SurfaceFrame, SurfaceId, SurfaceRole};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Host hooks that record invocations instead of exiting the test process.
#[derive(Default)]
pub struct RecordingHooks {
    pub input_hook_stopped: AtomicBool,
    pub storage_flushed: AtomicBool,
    pub relaunched: AtomicBool,
    pub exited: AtomicBool,
}

impl HostHooks for RecordingHooks {
    fn stop_input_hook(&self) {
        self.input_hook_stopped.store(true, Ordering::SeqCst);
    }

    fn flush_storage(&self) {
        self.storage_flushed.store(true, Ordering::SeqCst);
    }

    fn relaunch(&self) {
        self.relaunched.store(true, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

/// Test helper: start a hub and gateway on an ephemeral port.
pub async fn start_test_server(
    config: HubConfig,
    hooks: Arc<RecordingHooks>,
) -> (u16, HubHandle) {
    let hub = start_hub(&config, hooks);
    let handle = start_ipc_server(0, hub.clone())
        .await
        .expect("Failed to start IPC gateway");
    (handle.local_addr.port(), hub)
}

/// Test helper: connect to the gateway.
pub async fn connect(port: u16) -> Ws {
    let url = format!("{}:{port}", hub_core::IPC_WS_BASE_URL);
    let (ws, _) = connect_async(&url)
        .await
        .expect("Failed to connect to IPC gateway");
    ws
}

/// Test helper: send a frame as JSON text.
pub async fn send_frame(ws: &mut Ws, frame: &ClientFrame) {
    let text = serde_json::to_string(frame).expect("Failed to encode frame");
    ws.send(Message::Text(text.into()))
        .await
        .expect("Failed to send frame");
}

/// Test helper: receive the next frame, failing after a timeout.
pub async fn recv_frame(ws: &mut Ws) -> SurfaceFrame {
    let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("Connection closed")
        .expect("Error receiving frame");

    match msg {
        Message::Text(text) => {
            serde_json::from_str(text.as_str()).expect("Failed to decode frame")
        }
        other => panic!("Expected text frame, got {other:?}"),
    }
}

/// Test helper: assert no frame arrives within `window`.
pub async fn assert_no_frame(ws: &mut Ws, window: Duration) {
    if let Ok(Some(msg)) = tokio::time::timeout(window, ws.next()).await {
        panic!("Expected silence, got {msg:?}");
    }
}

/// Test helper: connect and attach a surface, asserting the handshake reply.
pub async fn attach(port: u16, id: &str, role: SurfaceRole) -> Ws {
    let mut ws = connect(port).await;
    send_frame(
        &mut ws,
        &ClientFrame::Attach {
            id: SurfaceId::new(id),
            role,
        },
    )
    .await;

    match recv_frame(&mut ws).await {
        SurfaceFrame::Attached { ok: true, .. } => ws,
        other => panic!("Expected attached frame, got {other:?}"),
    }
}
