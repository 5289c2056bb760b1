//! IPC gateway between surface processes and the hub.
//!
//! Surfaces connect over a localhost-only WebSocket and speak the JSON frame
//! protocol in [`crate::proto`]. The gateway translates frames into hub
//! commands and pumps each surface's outbound channel back into its socket.
//!
//! # Protocol
//!
//! 1. First frame MUST be `attach {id, role}`; anything else closes the
//!    connection.
//! 2. The gateway replies `attached` and from then on dispatches frames
//!    exhaustively on the closed [`crate::proto::ClientFrame`] enum.
//! 3. Blocking calls stall the connection's read loop until the response is
//!    resolved - the calling surface is frozen by contract anyway.
//! 4. A dropped connection reports the surface as closed to the hub.
//!
//! # Security
//!
//! - Binds `127.0.0.1` only (no network exposure)
//! - Non-loopback connections are rejected silently

mod handle;
mod server;

pub use handle::IpcServerHandle;
pub use server::start_ipc_server;
