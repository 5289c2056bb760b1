//! Shutdown coordinator: the graceful-termination state machine.
//!
//! Shutdown has a single entry point - a close request on the primary
//! surface. The coordinator sends the worker a shutdown notice, waits a
//! bounded time for an acknowledgment, and escalates to a forced close when
//! the worker is wedged. Close requests on every other surface role are
//! intercepted by explicit per-role guards instead of ad hoc listeners.
//!
//! # States
//!
//! `Running -> ShutdownRequested -> WaitingAck -> Closing -> Terminated`
//!
//! The `ShutdownRequested -> WaitingAck` hop is immediate. `WaitingAck`
//! leaves either on the worker's ack (timer canceled) or on timer expiry
//! (force-override set). `Terminated` closes the primary and worker
//! unconditionally; host-side teardown (input hook, storage flush, process
//! exit) runs once the worker surface is gone.

use crate::hub::registry::SurfaceRegistry;
use crate::hub::state::HubCommand;
use crate::proto::{CloseDecision, SurfaceFrame, SurfaceId, SurfaceLifecycle, SurfaceRole};

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Process-wide shutdown state, singly owned by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShutdownRequested,
    WaitingAck,
    Closing,
    Terminated,
}

/// Sequences graceful termination of all surfaces and the worker.
pub struct ShutdownCoordinator {
    state: ShutdownState,
    /// Set on timer expiry; subsequent close attempts bypass interception.
    force_close: bool,
    /// Set once the primary surface may really close (complete or forced).
    close_allowed: bool,
    relaunch_requested: bool,
    timer: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: ShutdownState::Running,
            force_close: false,
            close_allowed: false,
            relaunch_requested: false,
            timer: None,
            timeout,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ShutdownState::Terminated
    }

    pub fn is_force_close(&self) -> bool {
        self.force_close
    }

    pub fn relaunch_requested(&self) -> bool {
        self.relaunch_requested
    }

    /// Decide whether `id` may close, per its role and the current state.
    ///
    /// - Primary: vetoed until shutdown completes (or is forced); the first
    ///   veto begins the shutdown sequence.
    /// - Worker: vetoed before shutdown starts; the close is redirected to
    ///   the primary so it cannot die before the other surfaces.
    /// - Secondary: vetoed and hidden while not closing; real shutdown intent
    ///   is redirected to the primary's close path.
    /// - Other: never intercepted.
    pub fn close_requested(
        &mut self,
        registry: &mut SurfaceRegistry,
        self_tx: &mpsc::Sender<HubCommand>,
        id: &SurfaceId,
    ) -> CloseDecision {
        let Some(entry) = registry.lookup(id) else {
            // Unknown surface, nothing to guard.
            return CloseDecision::Allow;
        };

        match entry.role {
            SurfaceRole::Primary => {
                if self.close_allowed || self.force_close {
                    return CloseDecision::Allow;
                }
                // One-shot: repeated close signals must not start a second
                // timer or send a duplicate shutdown notice.
                self.begin_shutdown(registry, self_tx);
                CloseDecision::Veto
            }
            SurfaceRole::Worker => {
                if self.close_allowed || self.force_close || self.is_terminated() {
                    return CloseDecision::Allow;
                }
                info!("Worker close vetoed; redirecting to primary surface");
                self.redirect_to_primary(registry);
                CloseDecision::Veto
            }
            SurfaceRole::Secondary => {
                if matches!(
                    self.state,
                    ShutdownState::Closing | ShutdownState::Terminated
                ) || self.force_close
                {
                    return CloseDecision::Allow;
                }
                info!("Secondary surface {id} close vetoed; hiding instead");
                self.redirect_to_primary(registry);
                CloseDecision::VetoAndHide
            }
            SurfaceRole::Other => CloseDecision::Allow,
        }
    }

    /// `Running -> ShutdownRequested -> WaitingAck`, guarded one-shot.
    ///
    /// Sends the worker a shutdown notice and starts the bounded ack timer.
    /// Returns false when shutdown has already started.
    pub fn begin_shutdown(
        &mut self,
        registry: &mut SurfaceRegistry,
        self_tx: &mpsc::Sender<HubCommand>,
    ) -> bool {
        if self.state != ShutdownState::Running {
            debug!("Shutdown already started; ignoring duplicate trigger");
            return false;
        }
        self.state = ShutdownState::ShutdownRequested;
        info!(
            "Shutdown requested; notifying worker (ack timeout {:?})",
            self.timeout
        );

        match registry.worker_id() {
            Some(worker) => {
                registry.send_to(&worker, SurfaceFrame::ShutdownNotice);
            }
            None => warn!("Shutdown requested with no worker attached"),
        }

        let timeout = self.timeout;
        let tx = self_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(HubCommand::ShutdownTimerFired).await;
        }));

        // No external event separates these two states.
        self.state = ShutdownState::WaitingAck;
        true
    }

    /// Worker acknowledged the shutdown notice: cancel the timer.
    pub fn on_ack(&mut self) {
        if self.state != ShutdownState::WaitingAck {
            warn!("Shutdown ack in state {:?}; ignoring", self.state);
            return;
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        info!("Worker acknowledged shutdown");
        self.state = ShutdownState::Closing;
    }

    /// The ack timer fired without an acknowledgment: forced path.
    pub fn on_timer_fired(&mut self, registry: &mut SurfaceRegistry) {
        if self.state != ShutdownState::WaitingAck {
            debug!("Stale shutdown timer in state {:?}; ignoring", self.state);
            return;
        }
        warn!("Worker did not acknowledge shutdown in time; forcing close");
        self.timer = None;
        self.force_close = true;
        self.close_allowed = true;
        self.state = ShutdownState::Closing;
        self.terminate(registry);
    }

    /// Worker reports its shutdown work is done: normal path to Terminated.
    pub fn on_complete(&mut self, registry: &mut SurfaceRegistry) {
        if self.is_terminated() {
            debug!("Shutdown complete after termination; ignoring");
            return;
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        info!("Worker reported shutdown complete");
        self.close_allowed = true;
        self.terminate(registry);
    }

    /// Flag a relaunch and route the close through the primary surface, the
    /// single shutdown entry point.
    pub fn request_restart(&mut self, registry: &SurfaceRegistry) {
        info!("Restart requested; closing primary surface");
        self.relaunch_requested = true;
        self.redirect_to_primary(registry);
    }

    /// Close the primary and worker surfaces unconditionally.
    fn terminate(&mut self, registry: &mut SurfaceRegistry) {
        self.state = ShutdownState::Terminated;

        for id in [registry.primary_id(), registry.worker_id()]
            .into_iter()
            .flatten()
        {
            if let Some(entry) = registry.lookup_mut(&id) {
                entry.lifecycle = SurfaceLifecycle::Closing;
            }
            registry.send_to(&id, SurfaceFrame::ForceClose);
        }
    }

    fn redirect_to_primary(&self, registry: &SurfaceRegistry) {
        match registry.primary_id() {
            Some(primary) => {
                registry.send_to(&primary, SurfaceFrame::CloseRequest);
            }
            None => warn!("No primary surface to redirect close request to"),
        }
    }
}
