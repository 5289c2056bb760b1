//! Surface registry: the live set of surfaces and how to reach them.
//!
//! The registry owns no surface content - only a role, a lifecycle state and
//! an outbound channel sufficient to send frames. A surface whose outbound
//! channel has closed counts as destroyed and is skipped by broadcasts.

use crate::proto::{SurfaceFrame, SurfaceId, SurfaceLifecycle, SurfaceRole};

use std::collections::HashMap;

use log::{debug, warn};
use tokio::sync::mpsc;

/// A registered surface: role, lifecycle and its outbound frame channel.
pub struct SurfaceEntry {
    pub role: SurfaceRole,
    pub lifecycle: SurfaceLifecycle,
    sender: mpsc::UnboundedSender<SurfaceFrame>,
}

impl SurfaceEntry {
    /// Whether the surface can still receive frames.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Send a frame to this surface. Returns false if it is destroyed.
    pub fn send(&self, frame: SurfaceFrame) -> bool {
        self.sender.send(frame).is_ok()
    }
}

/// Tracks the live set of surfaces and provides lookup and fan-out.
#[derive(Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<SurfaceId, SurfaceEntry>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface. Idempotent: re-registering an already-known id is
    /// a no-op and the original entry is kept.
    pub fn register(
        &mut self,
        id: SurfaceId,
        role: SurfaceRole,
        sender: mpsc::UnboundedSender<SurfaceFrame>,
    ) -> bool {
        if self.surfaces.contains_key(&id) {
            debug!("Surface {id} already registered; ignoring re-register");
            return false;
        }

        self.surfaces.insert(
            id.clone(),
            SurfaceEntry {
                role,
                lifecycle: SurfaceLifecycle::Created,
                sender,
            },
        );
        debug!("Registered surface {id} with role {role:?}");
        true
    }

    /// Remove a surface. Idempotent: unknown ids are ignored.
    ///
    /// The returned entry is the final record of the surface, with its
    /// lifecycle advanced to `Closed`.
    pub fn unregister(&mut self, id: &SurfaceId) -> Option<SurfaceEntry> {
        let mut removed = self.surfaces.remove(id)?;
        removed.lifecycle = SurfaceLifecycle::Closed;
        debug!("Unregistered surface {id}");
        Some(removed)
    }

    pub fn lookup(&self, id: &SurfaceId) -> Option<&SurfaceEntry> {
        self.surfaces.get(id)
    }

    pub fn lookup_mut(&mut self, id: &SurfaceId) -> Option<&mut SurfaceEntry> {
        self.surfaces.get_mut(id)
    }

    /// Id of the worker surface, if one is attached.
    pub fn worker_id(&self) -> Option<SurfaceId> {
        self.first_with_role(SurfaceRole::Worker)
    }

    /// Id of the primary surface, if one is attached.
    pub fn primary_id(&self) -> Option<SurfaceId> {
        self.first_with_role(SurfaceRole::Primary)
    }

    fn first_with_role(&self, role: SurfaceRole) -> Option<SurfaceId> {
        self.surfaces
            .iter()
            .find(|(_, entry)| entry.role == role)
            .map(|(id, _)| id.clone())
    }

    /// Send a frame to one surface. Returns false if the surface is unknown
    /// or destroyed.
    pub fn send_to(&self, id: &SurfaceId, frame: SurfaceFrame) -> bool {
        match self.surfaces.get(id) {
            Some(entry) if entry.is_alive() => entry.send(frame),
            Some(_) => {
                warn!("Dropping frame for destroyed surface {id}");
                false
            }
            None => {
                warn!("Dropping frame for unknown surface {id}");
                false
            }
        }
    }

    /// Deliver a frame to every alive surface whose id is not excluded.
    /// Delivery order across surfaces is unspecified.
    pub fn broadcast(&self, frame: &SurfaceFrame, exclude: &[&SurfaceId]) {
        for (id, entry) in &self.surfaces {
            if exclude.contains(&id) || !entry.is_alive() {
                continue;
            }
            entry.send(frame.clone());
        }
    }

    /// Snapshot of the current id/role table.
    pub fn id_table(&self) -> Vec<(SurfaceId, SurfaceRole)> {
        self.surfaces
            .iter()
            .map(|(id, entry)| (id.clone(), entry.role))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
