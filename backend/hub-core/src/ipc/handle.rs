//! IPC gateway handle type.

use std::net::SocketAddr;

/// Handle to a running IPC gateway.
///
/// Returned by [`start_ipc_server`](crate::ipc::start_ipc_server). The accept
/// loop runs as a background task until the process exits; the handle mainly
/// exposes the bound address (useful when binding port 0 in tests).
pub struct IpcServerHandle {
    pub local_addr: SocketAddr,
}
