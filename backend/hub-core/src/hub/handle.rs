//! Cloneable handle to the hub actor.
//!
//! All interaction with the hub goes through this handle; it only sends
//! [`HubCommand`] messages and never touches coordination state directly.
//! Blocking calls are modeled as oneshot futures resolved exactly once by the
//! request broker.

use crate::error::hub::HubError;
use crate::hub::broker::PendingCaller;
use crate::hub::state::HubCommand;
use crate::proto::{
    CloseDecision, RequestEnvelope, ResponseEnvelope, SurfaceFrame, SurfaceId, SurfaceRole,
};

use common::ErrorLocation;

use std::panic::Location;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// Handle to a running hub actor. Clones share the same actor.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub(crate) fn new(tx: mpsc::Sender<HubCommand>) -> Self {
        Self { tx }
    }

    /// Attach a surface with its outbound frame channel (supplied by the IPC
    /// gateway, which owns the connection's writer task).
    ///
    /// Returns false when the id is already registered to a live surface; the
    /// existing registration is untouched in that case.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the hub actor is gone.
    pub async fn attach_with(
        &self,
        id: SurfaceId,
        role: SurfaceRole,
        sender: mpsc::UnboundedSender<SurfaceFrame>,
    ) -> Result<bool, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Attach {
            id,
            role,
            sender,
            reply: tx,
        })
        .await?;

        rx.await.map_err(|_| HubError::Stopped {
            message: "hub dropped the attach reply".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Issue a blocking call: the returned future resolves when the worker
    /// responds, the request times out, or the hub stops.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the hub actor is gone. Worker-side
    /// failures and timeouts arrive as the error payload of the envelope.
    pub async fn call(&self, request: RequestEnvelope) -> Result<ResponseEnvelope, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Call {
            request,
            caller: PendingCaller::Blocking(tx),
        })
        .await?;

        rx.await.map_err(|_| HubError::Stopped {
            message: "hub dropped the pending call".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Issue a non-blocking call: the response is delivered later as a
    /// `response` frame on the origin surface's channel.
    pub async fn call_async(
        &self,
        origin: SurfaceId,
        request: RequestEnvelope,
    ) -> Result<(), HubError> {
        self.send(HubCommand::Call {
            request,
            caller: PendingCaller::NonBlocking(origin),
        })
        .await
    }

    /// Deliver a worker response to the broker.
    pub async fn response(&self, response: ResponseEnvelope) -> Result<(), HubError> {
        self.send(HubCommand::Response { response }).await
    }

    /// Fire-and-forget broadcast, excluding the worker and the origin.
    pub async fn message(&self, origin: SurfaceId, payload: Value) -> Result<(), HubError> {
        self.send(HubCommand::Message { origin, payload }).await
    }

    /// Subscribe a surface to authoritative state.
    pub async fn subscribe(&self, id: SurfaceId) -> Result<(), HubError> {
        self.send(HubCommand::Subscribe { id }).await
    }

    /// Worker signal: initialization finished.
    pub async fn boot_complete(&self) -> Result<(), HubError> {
        self.send(HubCommand::BootComplete).await
    }

    /// Propagate a state mutation from `origin`.
    pub async fn mutation(&self, origin: SurfaceId, mutation: Value) -> Result<(), HubError> {
        self.send(HubCommand::Mutation { origin, mutation }).await
    }

    /// Ask whether `id` may close; stalls until the hub decides.
    pub async fn close_requested(&self, id: SurfaceId) -> Result<CloseDecision, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::CloseRequested { id, reply: tx })
            .await?;

        rx.await.map_err(|_| HubError::Stopped {
            message: "hub dropped the close decision".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Report a surface as gone (window closed or connection dropped).
    pub async fn surface_closed(&self, id: SurfaceId) -> Result<(), HubError> {
        self.send(HubCommand::SurfaceClosed { id }).await
    }

    /// Worker acknowledges the shutdown notice.
    pub async fn shutdown_ack(&self) -> Result<(), HubError> {
        self.send(HubCommand::ShutdownAck).await
    }

    /// Worker reports its shutdown work is done.
    pub async fn shutdown_complete(&self) -> Result<(), HubError> {
        self.send(HubCommand::ShutdownComplete).await
    }

    /// Relaunch the application through the orderly shutdown path.
    pub async fn restart(&self) -> Result<(), HubError> {
        self.send(HubCommand::Restart).await
    }

    /// Snapshot of the current surface id/role table.
    pub async fn surface_table(&self) -> Result<Vec<(SurfaceId, SurfaceRole)>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::SurfaceTable { reply: tx }).await?;

        rx.await.map_err(|_| HubError::Stopped {
            message: "hub dropped the surface table reply".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), HubError> {
        self.tx.send(cmd).await.map_err(|_| HubError::Stopped {
            message: "hub actor is not running".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
