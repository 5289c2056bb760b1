// Unit tests for the surface registry: idempotent registration, lookup and
// broadcast exclusion semantics.

use crate::hub::registry::SurfaceRegistry;
use crate::proto::{SurfaceFrame, SurfaceId, SurfaceLifecycle, SurfaceRole};

use tokio::sync::mpsc;

fn surface(
    registry: &mut SurfaceRegistry,
    id: &str,
    role: SurfaceRole,
) -> mpsc::UnboundedReceiver<SurfaceFrame> {
    let (tx, rx) = mpsc::unbounded_channel();
    registry.register(SurfaceId::new(id), role, tx);
    rx
}

#[test]
fn given_registered_id_when_registered_again_then_original_entry_kept() {
    // GIVEN: A registered surface
    let mut registry = SurfaceRegistry::new();
    let mut rx = surface(&mut registry, "primary", SurfaceRole::Primary);

    // WHEN: The same id registers again with a different channel
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    let registered = registry.register(SurfaceId::new("primary"), SurfaceRole::Primary, tx2);

    // THEN: The re-register is a no-op and frames still reach the original channel
    assert!(!registered, "Re-register should be a no-op");
    assert_eq!(registry.len(), 1);
    registry.send_to(&SurfaceId::new("primary"), SurfaceFrame::InitFinished);
    assert!(rx.try_recv().is_ok(), "Original channel should receive");
    assert!(rx2.try_recv().is_err(), "Second channel must not receive");
}

#[test]
fn given_registered_surface_when_unregistered_then_final_entry_marked_closed() {
    // GIVEN: A registered surface
    let mut registry = SurfaceRegistry::new();
    let _rx = surface(&mut registry, "panel", SurfaceRole::Secondary);

    // WHEN: It is unregistered
    let entry = registry.unregister(&SurfaceId::new("panel")).unwrap();

    // THEN: The returned record reflects the terminal lifecycle state
    assert_eq!(entry.lifecycle, SurfaceLifecycle::Closed);
    assert!(registry.is_empty());
}

#[test]
fn given_unknown_id_when_unregistered_then_noop() {
    let mut registry = SurfaceRegistry::new();
    assert!(registry.unregister(&SurfaceId::new("ghost")).is_none());
    assert!(registry.is_empty());
}

#[test]
fn given_roles_when_looked_up_then_worker_and_primary_found() {
    let mut registry = SurfaceRegistry::new();
    let _worker = surface(&mut registry, "worker", SurfaceRole::Worker);
    let _primary = surface(&mut registry, "primary", SurfaceRole::Primary);

    assert_eq!(registry.worker_id(), Some(SurfaceId::new("worker")));
    assert_eq!(registry.primary_id(), Some(SurfaceId::new("primary")));
    assert!(registry.lookup(&SurfaceId::new("worker")).is_some());
    assert!(registry.lookup(&SurfaceId::new("ghost")).is_none());
}

#[test]
fn given_excluded_and_destroyed_surfaces_when_broadcast_then_only_live_included_receive() {
    // GIVEN: Three surfaces, one destroyed (receiver dropped), one excluded
    let mut registry = SurfaceRegistry::new();
    let mut a = surface(&mut registry, "a", SurfaceRole::Secondary);
    let mut b = surface(&mut registry, "b", SurfaceRole::Secondary);
    let dead = surface(&mut registry, "dead", SurfaceRole::Secondary);
    drop(dead);

    // WHEN: Broadcasting with "b" excluded
    let exclude_id = SurfaceId::new("b");
    registry.broadcast(&SurfaceFrame::InitFinished, &[&exclude_id]);

    // THEN: Only the live, non-excluded surface receives the frame
    assert!(a.try_recv().is_ok(), "Live surface should receive");
    assert!(b.try_recv().is_err(), "Excluded surface must not receive");
}

#[test]
fn given_destroyed_surface_when_sent_to_then_delivery_fails() {
    let mut registry = SurfaceRegistry::new();
    let rx = surface(&mut registry, "gone", SurfaceRole::Other);
    drop(rx);

    assert!(!registry.send_to(&SurfaceId::new("gone"), SurfaceFrame::ForceClose));
    assert!(!registry.send_to(&SurfaceId::new("never"), SurfaceFrame::ForceClose));
}
