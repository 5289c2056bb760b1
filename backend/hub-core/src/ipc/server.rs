//! IPC WebSocket gateway implementation.
//!
//! One connection per surface. The first frame must be an `attach` handshake
//! declaring the surface id and role; afterwards every frame maps onto a hub
//! command. All outbound traffic for a surface flows through its unbounded
//! frame channel into a single writer task, which keeps per-surface delivery
//! FIFO.

use crate::error::hub::HubError;
use crate::error::ipc::IpcError;
use crate::hub::HubHandle;
use crate::ipc::handle::IpcServerHandle;
use crate::proto::{ClientFrame, SurfaceFrame, SurfaceId, SurfaceRole};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Starts the IPC gateway on the specified localhost port.
///
/// Binds `127.0.0.1:<port>` and spawns a background task accepting surface
/// connections, each served by [`handle_connection`].
///
/// # Arguments
///
/// * `ipc_port` - Port to bind on localhost; 0 picks a free port
/// * `hub` - Handle to the running hub actor
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the port cannot be bound.
///
/// # Security
///
/// - Binds to `127.0.0.1` only
/// - Individual connections reject non-loopback clients
pub async fn start_ipc_server(ipc_port: u16, hub: HubHandle) -> Result<IpcServerHandle, IpcError> {
    let address = format!("{}:{ipc_port}", crate::IPC_HOSTNAME);
    let listener = TcpListener::bind(&address).await?;
    let local_addr = listener.local_addr()?;

    info!("IPC gateway listening on {local_addr}");

    tokio::spawn(async move {
        while let Ok((stream, addr)) = listener.accept().await {
            debug!("Surface connecting from {addr}");
            let hub_clone = hub.clone();
            tokio::spawn(handle_connection(stream, addr, hub_clone));
        }
    });

    Ok(IpcServerHandle { local_addr })
}

/// Handles a single surface connection.
///
/// 1. Performs the WebSocket handshake
/// 2. **Rejects non-loopback connections**
/// 3. **Requires an `attach` frame as the first message**
/// 4. Registers the surface with the hub and pumps frames both ways
///
/// # Errors
///
/// - [`IpcError::Handshake`] - WebSocket upgrade failed
/// - [`IpcError::Read`] - Failed to read a message from the surface
///
/// A clean disconnect returns `Ok(())`; either way the surface is reported
/// closed to the hub before the task ends.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: HubHandle,
) -> Result<(), IpcError> {
    // Reject non-loopback connections silently.
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {addr}");
        return Ok(());
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            error!("WebSocket handshake failed: {e}");
            return Err(IpcError::Handshake {
                message: format!("WebSocket handshake failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };

    let (write, mut read) = ws_stream.split();

    // First frame MUST be the attach handshake.
    let (id, role) = match read.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(ClientFrame::Attach { id, role }) => (id, role),
            Ok(_) => {
                warn!("Surface {addr} sent a non-attach first frame; closing");
                return Ok(());
            }
            Err(e) => {
                warn!("Surface {addr} sent an undecodable first frame: {e}");
                return Ok(());
            }
        },
        Some(Ok(_)) => {
            warn!("Surface {addr} sent a non-text first message; closing");
            return Ok(());
        }
        Some(Err(e)) => {
            error!("Error reading first frame from {addr}: {e}");
            return Err(IpcError::Read {
                message: format!("Error reading first frame: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            warn!("Surface {addr} disconnected before attaching");
            return Ok(());
        }
    };

    // The writer task solely owns the sink; everything outbound goes through
    // this channel, including replies produced by the read loop below.
    let (out_tx, out_rx) = mpsc::unbounded_channel::<SurfaceFrame>();
    let writer = tokio::spawn(write_frames(write, out_rx));

    let registered = match hub.attach_with(id.clone(), role, out_tx.clone()).await {
        Ok(registered) => registered,
        Err(_) => {
            warn!("Hub gone while attaching surface {id}");
            return Ok(());
        }
    };

    // A duplicate id never owns the registry entry; dropping this connection
    // must not report the original surface as closed.
    if !registered {
        warn!("Surface id {id} already attached; rejecting duplicate connection");
        let _ = out_tx.send(SurfaceFrame::Attached {
            ok: false,
            error: Some("surface id already attached".to_string()),
        });
        drop(out_tx);
        let _ = writer.await;
        return Ok(());
    }

    info!("Surface {id} attached from {addr} with role {role:?}");
    let _ = out_tx.send(SurfaceFrame::Attached {
        ok: true,
        error: None,
    });

    // Main frame loop (attached).
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let frame = match serde_json::from_str::<ClientFrame>(text.as_str()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Undecodable frame from surface {id}: {e}");
                        let _ = out_tx.send(SurfaceFrame::Error {
                            message: format!("invalid frame: {e}"),
                        });
                        continue;
                    }
                };

                if handle_frame(frame, &id, &hub, &out_tx).await.is_err() {
                    warn!("Hub gone; dropping connection for surface {id}");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                debug!("Ignoring non-text message from surface {id}");
            }
            Err(e) => {
                error!("Error reading from surface {id}: {e}");
                break;
            }
        }
    }

    info!("Surface {id} disconnected");
    let _ = hub.surface_closed(id).await;
    drop(out_tx);
    let _ = writer.await;
    Ok(())
}

/// Dispatch one inbound frame onto the hub.
///
/// Blocking calls and close requests are awaited inline: the surface on the
/// other end is stalled until the reply frame anyway, so stalling its read
/// loop preserves the contract without blocking the hub.
async fn handle_frame(
    frame: ClientFrame,
    id: &SurfaceId,
    hub: &HubHandle,
    out_tx: &mpsc::UnboundedSender<SurfaceFrame>,
) -> Result<(), HubError> {
    use crate::proto::CallerMode;

    match frame {
        ClientFrame::Attach { .. } => {
            warn!("Surface {id} sent attach twice");
            let _ = out_tx.send(SurfaceFrame::Error {
                message: "already attached".to_string(),
            });
            Ok(())
        }
        ClientFrame::Call { mode, request } => match mode {
            CallerMode::Blocking => {
                let response = hub.call(request).await?;
                let _ = out_tx.send(SurfaceFrame::Response { response });
                Ok(())
            }
            CallerMode::NonBlocking => hub.call_async(id.clone(), request).await,
        },
        ClientFrame::Response { response } => hub.response(response).await,
        ClientFrame::Message { payload } => hub.message(id.clone(), payload).await,
        ClientFrame::Subscribe => hub.subscribe(id.clone()).await,
        ClientFrame::BootComplete => hub.boot_complete().await,
        ClientFrame::Mutation { mutation } => hub.mutation(id.clone(), mutation).await,
        ClientFrame::CloseRequested => {
            let decision = hub.close_requested(id.clone()).await?;
            let _ = out_tx.send(SurfaceFrame::CloseDecision { decision });
            Ok(())
        }
        ClientFrame::Restart => hub.restart().await,
        ClientFrame::ShutdownAck => hub.shutdown_ack().await,
        ClientFrame::ShutdownComplete => hub.shutdown_complete().await,
    }
}

/// Writer task: pumps a surface's outbound channel into its socket, FIFO.
async fn write_frames(
    mut write: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut out_rx: mpsc::UnboundedReceiver<SurfaceFrame>,
) {
    while let Some(frame) = out_rx.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode outbound frame: {e}");
                continue;
            }
        };
        if let Err(e) = write.send(Message::Text(text.into())).await {
            debug!("Surface connection gone while writing: {e}");
            break;
        }
    }
}
