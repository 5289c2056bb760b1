// Unit tests for the state sync hub: snapshot queueing, boot-complete
// one-shot semantics and mutation fan-out.

use crate::hub::registry::SurfaceRegistry;
use crate::hub::sync::StateSyncHub;
use crate::proto::{SurfaceFrame, SurfaceId, SurfaceLifecycle, SurfaceRole};

use serde_json::json;
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

fn drain(rx: &mut mpsc::UnboundedReceiver<SurfaceFrame>) -> Vec<SurfaceFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[test]
fn given_subscribers_before_boot_when_boot_completes_then_snapshots_in_registration_order() {
    // GIVEN: Two surfaces subscribing before the worker finished booting
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut sync = StateSyncHub::new();

    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));
    sync.register_subscriber(&mut registry, SurfaceId::new("settings"));

    // THEN: Nothing is pushed yet
    assert!(worker_rx.try_recv().is_err());

    // WHEN: The worker signals boot complete
    sync.on_boot_complete(&registry);

    // THEN: Every live surface is notified, then snapshots are requested in
    // registration order
    let worker_frames = drain(&mut worker_rx);
    assert!(matches!(worker_frames[0], SurfaceFrame::InitFinished));
    assert!(
        matches!(&worker_frames[1], SurfaceFrame::SnapshotPush { surface_id } if surface_id.as_str() == "primary")
    );
    assert!(
        matches!(&worker_frames[2], SurfaceFrame::SnapshotPush { surface_id } if surface_id.as_str() == "settings")
    );
    assert!(matches!(
        primary_rx.try_recv(),
        Ok(SurfaceFrame::InitFinished)
    ));
}

#[test]
fn given_boot_complete_when_surface_subscribes_then_snapshot_immediate() {
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let _primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut sync = StateSyncHub::new();

    sync.on_boot_complete(&registry);
    drain(&mut worker_rx);

    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));

    let frames = drain(&mut worker_rx);
    assert_eq!(frames.len(), 1, "Exactly one snapshot push, no queuing");
    assert!(
        matches!(&frames[0], SurfaceFrame::SnapshotPush { surface_id } if surface_id.as_str() == "primary")
    );
}

#[test]
fn given_subscribed_surface_when_subscribed_again_then_noop() {
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let _primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut sync = StateSyncHub::new();
    sync.on_boot_complete(&registry);
    drain(&mut worker_rx);

    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));
    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));

    assert_eq!(
        drain(&mut worker_rx).len(),
        1,
        "Double subscribe must not trigger a second snapshot"
    );
}

#[test]
fn given_boot_complete_when_signaled_again_then_no_second_notification() {
    let mut registry = SurfaceRegistry::new();
    let mut primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut sync = StateSyncHub::new();

    sync.on_boot_complete(&registry);
    sync.on_boot_complete(&registry);

    assert_eq!(drain(&mut primary_rx).len(), 1, "initFinished is one-shot");
    assert!(sync.is_boot_complete());
}

#[test]
fn given_mutations_from_one_origin_when_propagated_then_fifo_everywhere_except_origin_and_worker() {
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut settings_rx = surface(&mut registry, "settings", SurfaceRole::Secondary);
    let mut sync = StateSyncHub::new();
    sync.on_boot_complete(&registry);

    sync.register_subscriber(&mut registry, SurfaceId::new("worker"));
    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));
    sync.register_subscriber(&mut registry, SurfaceId::new("settings"));
    drain(&mut worker_rx);
    drain(&mut primary_rx);
    drain(&mut settings_rx);

    // WHEN: The primary emits three mutations in order
    let origin = SurfaceId::new("primary");
    for i in 0..3 {
        sync.propagate_mutation(&registry, &origin, &json!({ "seq": i }));
    }

    // THEN: The secondary receives all three in emission order
    let frames = drain(&mut settings_rx);
    assert_eq!(frames.len(), 3);
    for (i, frame) in frames.iter().enumerate() {
        match frame {
            SurfaceFrame::Mutation { origin, mutation } => {
                assert_eq!(origin.as_str(), "primary");
                assert_eq!(mutation, &json!({ "seq": i }));
            }
            other => panic!("Expected mutation frame, got {other:?}"),
        }
    }

    // THEN: Neither the origin nor the worker sees its own traffic
    assert!(primary_rx.try_recv().is_err(), "Origin must be excluded");
    assert!(worker_rx.try_recv().is_err(), "Worker must be excluded");
}

#[test]
fn given_queued_subscriber_when_unregistered_then_no_snapshot_on_boot() {
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let _primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut sync = StateSyncHub::new();

    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));
    sync.unregister_subscriber(&SurfaceId::new("primary"));
    sync.on_boot_complete(&registry);

    let frames = drain(&mut worker_rx);
    assert!(
        !frames
            .iter()
            .any(|f| matches!(f, SurfaceFrame::SnapshotPush { .. })),
        "Removed subscriber must not receive a snapshot push"
    );
}

#[test]
fn given_surface_when_subscribed_then_lifecycle_becomes_ready() {
    let mut registry = SurfaceRegistry::new();
    let _primary_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut sync = StateSyncHub::new();

    sync.register_subscriber(&mut registry, SurfaceId::new("primary"));

    let entry = registry.lookup(&SurfaceId::new("primary")).unwrap();
    assert_eq!(entry.lifecycle, SurfaceLifecycle::Ready);
}
