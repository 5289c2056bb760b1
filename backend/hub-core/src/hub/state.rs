//! The hub actor: single owner of all coordination state.
//!
//! Every registry, pending-request map and subscriber set lives inside one
//! [`Hub`] value owned by a dedicated task. Inbound events arrive as
//! [`HubCommand`] messages and are processed to completion one at a time, so
//! no handler ever observes partial state and no external synchronization is
//! needed. Timers (shutdown ack, per-request expiry) are sleep tasks that
//! send commands back into the same channel.

use crate::config::HubConfig;
use crate::hub::broker::{PendingCaller, RequestBroker};
use crate::hub::handle::HubHandle;
use crate::hub::hooks::HostHooks;
use crate::hub::registry::SurfaceRegistry;
use crate::hub::shutdown::{ShutdownCoordinator, ShutdownState};
use crate::hub::sync::StateSyncHub;
use crate::proto::{
    CloseDecision, RequestEnvelope, ResponseEnvelope, SurfaceFrame, SurfaceId, SurfaceRole,
};

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

/// Inbound events processed by the hub actor.
///
/// This is the complete protocol surface of the hub: every mutation of
/// coordination state goes through exactly one of these commands.
pub enum HubCommand {
    /// A surface attached; `sender` is its outbound frame channel. The reply
    /// carries false when the id is already registered to a live surface.
    Attach {
        id: SurfaceId,
        role: SurfaceRole,
        sender: mpsc::UnboundedSender<SurfaceFrame>,
        reply: oneshot::Sender<bool>,
    },

    /// RPC call to forward to the worker.
    Call {
        request: RequestEnvelope,
        caller: PendingCaller,
    },

    /// A pending request's bound elapsed without a response.
    RequestExpired { id: String },

    /// RPC response from the worker.
    Response { response: ResponseEnvelope },

    /// Fire-and-forget broadcast from `origin`.
    Message { origin: SurfaceId, payload: Value },

    /// Subscribe a surface to authoritative state.
    Subscribe { id: SurfaceId },

    /// Worker signaled boot complete.
    BootComplete,

    /// State mutation emitted by `origin`.
    Mutation { origin: SurfaceId, mutation: Value },

    /// The host asks whether `id` may close.
    CloseRequested {
        id: SurfaceId,
        reply: oneshot::Sender<CloseDecision>,
    },

    /// The surface is gone (window closed / connection dropped).
    SurfaceClosed { id: SurfaceId },

    /// Worker acknowledged the shutdown notice.
    ShutdownAck,

    /// Worker finished its shutdown work.
    ShutdownComplete,

    /// The shutdown ack timer fired.
    ShutdownTimerFired,

    /// Relaunch after an orderly shutdown.
    Restart,

    /// Snapshot of the current surface id/role table.
    SurfaceTable {
        reply: oneshot::Sender<Vec<(SurfaceId, SurfaceRole)>>,
    },
}

/// Owner of the four coordination components.
struct Hub {
    registry: SurfaceRegistry,
    broker: RequestBroker,
    sync: StateSyncHub,
    shutdown: ShutdownCoordinator,
    hooks: Arc<dyn HostHooks>,
    self_tx: mpsc::Sender<HubCommand>,
    request_timeout: Duration,
}

/// Spawn the hub actor and return a cloneable handle to it.
pub fn start_hub(config: &HubConfig, hooks: Arc<dyn HostHooks>) -> HubHandle {
    let (tx, rx) = mpsc::channel(100);

    let hub = Hub {
        registry: SurfaceRegistry::new(),
        broker: RequestBroker::new(),
        sync: StateSyncHub::new(),
        shutdown: ShutdownCoordinator::new(config.shutdown_timeout()),
        hooks,
        self_tx: tx.clone(),
        request_timeout: config.request_timeout(),
    };

    tokio::spawn(hub_actor(rx, hub));
    info!("Hub actor spawned");

    HubHandle::new(tx)
}

/// The actor task: processes each command to completion before the next.
async fn hub_actor(mut command_rx: mpsc::Receiver<HubCommand>, mut hub: Hub) {
    info!("Hub actor started");

    while let Some(cmd) = command_rx.recv().await {
        hub.handle(cmd);
    }

    warn!("Hub actor stopped - all handles dropped");
}

impl Hub {
    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Attach {
                id,
                role,
                sender,
                reply,
            } => {
                let registered = self.registry.register(id, role, sender);
                let _ = reply.send(registered);
            }
            HubCommand::Call { request, caller } => self.handle_call(request, caller),
            HubCommand::RequestExpired { id } => {
                self.broker.expire(&self.registry, &id);
            }
            HubCommand::Response { response } => {
                self.broker.on_response(&self.registry, response);
            }
            HubCommand::Message { origin, payload } => {
                self.broker.on_message(&self.registry, &origin, payload);
            }
            HubCommand::Subscribe { id } => {
                self.sync.register_subscriber(&mut self.registry, id);
            }
            HubCommand::BootComplete => {
                self.sync.on_boot_complete(&self.registry);
            }
            HubCommand::Mutation { origin, mutation } => {
                self.sync.propagate_mutation(&self.registry, &origin, &mutation);
            }
            HubCommand::CloseRequested { id, reply } => {
                let decision =
                    self.shutdown
                        .close_requested(&mut self.registry, &self.self_tx, &id);
                if reply.send(decision).is_err() {
                    warn!("Close decision for {id} dropped: requester went away");
                }
            }
            HubCommand::SurfaceClosed { id } => self.handle_surface_closed(&id),
            HubCommand::ShutdownAck => self.shutdown.on_ack(),
            HubCommand::ShutdownComplete => {
                self.shutdown.on_complete(&mut self.registry);
                self.teardown_if_worker_gone();
            }
            HubCommand::ShutdownTimerFired => {
                self.shutdown.on_timer_fired(&mut self.registry);
                self.teardown_if_worker_gone();
            }
            HubCommand::Restart => self.shutdown.request_restart(&self.registry),
            HubCommand::SurfaceTable { reply } => {
                let _ = reply.send(self.registry.id_table());
            }
        }
    }

    fn handle_call(&mut self, request: RequestEnvelope, caller: PendingCaller) {
        // Invariant: at most one pending request per id. A colliding id is
        // rejected up front so the original entry is never clobbered.
        if self.broker.is_pending(&request.id) {
            warn!("Rejecting call with duplicate request id {}", request.id);
            let response = ResponseEnvelope::error(&request.id, json!("duplicate request id"));
            match caller {
                PendingCaller::Blocking(tx) => {
                    let _ = tx.send(response);
                }
                PendingCaller::NonBlocking(origin) => {
                    self.registry
                        .send_to(&origin, SurfaceFrame::Response { response });
                }
            }
            return;
        }

        let id = request.id.clone();
        if let Err(e) = self.broker.send(&self.registry, request, caller) {
            warn!("{e}");
            return;
        }

        // Bounded pending lifetime: expiry resolves the caller with a
        // definite error instead of leaking the entry.
        let timeout = self.request_timeout;
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(HubCommand::RequestExpired { id }).await;
        });
    }

    fn handle_surface_closed(&mut self, id: &SurfaceId) {
        self.sync.unregister_subscriber(id);

        let Some(entry) = self.registry.unregister(id) else {
            return;
        };

        if entry.role != SurfaceRole::Worker {
            return;
        }

        match self.shutdown.state() {
            ShutdownState::Running => {
                // Orphaned pending requests are recovered only by the
                // shutdown timeout path; there is no retry.
                warn!("Worker surface closed outside shutdown; requests will expire");
            }
            ShutdownState::Terminated => self.run_host_teardown(),
            _ => {
                // The worker is gone mid-shutdown; nothing else can ever
                // arrive from it, so its destruction stands in for the
                // completion signal.
                warn!("Worker surface closed during shutdown; completing termination");
                self.shutdown.on_complete(&mut self.registry);
                self.run_host_teardown();
            }
        }
    }

    /// Teardown waits on the worker surface; once `Terminated` is reached
    /// with no worker attached, no close event can ever trigger it, so it
    /// must run now.
    fn teardown_if_worker_gone(&self) {
        if self.shutdown.is_terminated() && self.registry.worker_id().is_none() {
            self.run_host_teardown();
        }
    }

    fn run_host_teardown(&self) {
        info!("Worker surface gone; running host teardown");
        self.hooks.stop_input_hook();
        self.hooks.flush_storage();
        if self.shutdown.relaunch_requested() {
            self.hooks.relaunch();
        }
        self.hooks.exit();
    }
}
