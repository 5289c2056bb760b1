//! State sync hub: snapshot scheduling and mutation fan-out.
//!
//! Surfaces subscribe to authoritative state held by the worker. A subscriber
//! that arrives before the worker signals boot-complete is queued; once the
//! worker is up each queued subscriber gets exactly one snapshot push, in
//! registration order. Mutations fan out to every subscriber except the
//! origin and the worker.

use crate::hub::registry::SurfaceRegistry;
use crate::proto::{SurfaceFrame, SurfaceId, SurfaceLifecycle};

use std::collections::{HashSet, VecDeque};

use log::{debug, info, warn};
use serde_json::Value;

/// Tracks subscribers and drives snapshot pushes and mutation propagation.
///
/// The snapshot queue doubles as the pre-boot pending record: an id is queued
/// exactly while its snapshot has not been requested yet.
#[derive(Default)]
pub struct StateSyncHub {
    subscribers: HashSet<SurfaceId>,
    snapshot_queue: VecDeque<SurfaceId>,
    boot_complete: bool,
}

impl StateSyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_boot_complete(&self) -> bool {
        self.boot_complete
    }

    pub fn is_subscribed(&self, id: &SurfaceId) -> bool {
        self.subscribers.contains(id)
    }

    /// Subscribe a surface to authoritative state. Idempotent.
    ///
    /// Before boot-complete the id is appended to a FIFO queue; afterwards a
    /// snapshot push is requested immediately. The worker itself never
    /// receives a snapshot of its own state.
    pub fn register_subscriber(&mut self, registry: &mut SurfaceRegistry, id: SurfaceId) {
        if self.is_subscribed(&id) {
            debug!("Surface {id} already subscribed; ignoring");
            return;
        }

        if let Some(entry) = registry.lookup_mut(&id) {
            entry.lifecycle = SurfaceLifecycle::Ready;
        }

        let is_worker = registry.worker_id().as_ref() == Some(&id);

        self.subscribers.insert(id.clone());
        info!("Surface {id} subscribed to state sync");

        if is_worker {
            return;
        }

        if self.boot_complete {
            Self::push_snapshot(registry, &id);
        } else {
            self.snapshot_queue.push_back(id);
        }
    }

    /// One-shot boot-complete transition; subsequent calls are no-ops.
    ///
    /// Notifies every live surface that initialization finished, then drains
    /// the snapshot queue in arrival order.
    pub fn on_boot_complete(&mut self, registry: &SurfaceRegistry) {
        if self.boot_complete {
            debug!("Boot complete already signaled; ignoring");
            return;
        }
        self.boot_complete = true;
        info!("Worker boot complete; notifying surfaces");

        registry.broadcast(&SurfaceFrame::InitFinished, &[]);

        while let Some(id) = self.snapshot_queue.pop_front() {
            Self::push_snapshot(registry, &id);
        }
    }

    /// Forward a mutation to every subscribed surface except the origin and
    /// the worker. The single hub task plus per-surface FIFO channels give
    /// per-origin delivery ordering; no order holds across origins.
    pub fn propagate_mutation(
        &self,
        registry: &SurfaceRegistry,
        origin: &SurfaceId,
        mutation: &Value,
    ) {
        let worker = registry.worker_id();

        for id in &self.subscribers {
            if id == origin || Some(id) == worker.as_ref() {
                continue;
            }
            registry.send_to(
                id,
                SurfaceFrame::Mutation {
                    origin: origin.clone(),
                    mutation: mutation.clone(),
                },
            );
        }
    }

    /// Remove a surface from the subscription set and the snapshot queue.
    pub fn unregister_subscriber(&mut self, id: &SurfaceId) {
        if self.subscribers.remove(id) {
            debug!("Surface {id} unsubscribed from state sync");
        }
        self.snapshot_queue.retain(|queued| queued != id);
    }

    fn push_snapshot(registry: &SurfaceRegistry, id: &SurfaceId) {
        let Some(worker) = registry.worker_id() else {
            warn!("Cannot request snapshot for {id}: no worker attached");
            return;
        };
        debug!("Requesting snapshot push for surface {id}");
        registry.send_to(
            &worker,
            SurfaceFrame::SnapshotPush {
                surface_id: id.clone(),
            },
        );
    }
}
