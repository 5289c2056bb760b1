use crate::hub_tests::helpers::{
    RecordingHooks, assert_no_frame, attach, recv_frame, send_frame, start_test_server,
};

use hub_core::config::HubConfig;
use hub_core::proto::{ClientFrame, SurfaceFrame, SurfaceRole};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

/// **VALUE**: Verifies pre-boot subscribers are queued and snapshotted once the
/// worker finishes booting, in subscription order.
///
/// **WHY THIS MATTERS**: Surfaces usually subscribe before the worker has any
/// state to give them. The hub must hold those subscriptions and ask the worker
/// for snapshots only after boot, or early subscribers would render against an
/// empty store forever.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Pre-boot subscriptions are dropped instead of queued
/// - The boot signal fails to drain the queue
/// - Snapshots are requested out of subscription order
/// - InitFinished is not broadcast to attached surfaces
#[tokio::test]
async fn given_preboot_subscribers_when_boot_completes_then_snapshots_pushed_in_order() {
    // GIVEN: a worker plus two surfaces that subscribe before boot
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;
    let mut panel = attach(port, "panel", SurfaceRole::Secondary).await;

    // Subscriptions arrive on separate connections; the pause keeps their
    // arrival order at the hub deterministic.
    send_frame(&mut primary, &ClientFrame::Subscribe).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    send_frame(&mut panel, &ClientFrame::Subscribe).await;

    // No snapshot is requested before the worker is ready.
    assert_no_frame(&mut worker, Duration::from_millis(200)).await;

    // WHEN: the worker signals boot completion
    send_frame(&mut worker, &ClientFrame::BootComplete).await;

    // THEN: every surface learns that initialization finished
    match recv_frame(&mut primary).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished at the primary, got {other:?}"),
    }
    match recv_frame(&mut panel).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished at the panel, got {other:?}"),
    }

    // AND: the worker is asked for snapshots in subscription order
    match recv_frame(&mut worker).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished at the worker, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::SnapshotPush { surface_id } => {
            assert_eq!(surface_id.as_str(), "primary");
        }
        other => panic!("Expected snapshot push for the primary, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::SnapshotPush { surface_id } => {
            assert_eq!(surface_id.as_str(), "panel");
        }
        other => panic!("Expected snapshot push for the panel, got {other:?}"),
    }
}

/// **VALUE**: Verifies a surface subscribing after boot gets its snapshot
/// requested immediately.
///
/// **WHY THIS MATTERS**: Surfaces opened mid-session must not wait for another
/// boot signal that will never come. Their snapshot request has to go out the
/// moment they subscribe.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Post-boot subscriptions are queued behind a boot signal that already fired
/// - The snapshot request names the wrong surface
#[tokio::test]
async fn given_booted_worker_when_surface_subscribes_then_snapshot_requested_immediately() {
    // GIVEN: a booted worker
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    send_frame(&mut worker, &ClientFrame::BootComplete).await;
    match recv_frame(&mut worker).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished at the worker, got {other:?}"),
    }

    // WHEN: a surface attaches and subscribes after boot
    let mut late = attach(port, "late-panel", SurfaceRole::Secondary).await;
    send_frame(&mut late, &ClientFrame::Subscribe).await;

    // THEN: the worker is asked for its snapshot right away
    match recv_frame(&mut worker).await {
        SurfaceFrame::SnapshotPush { surface_id } => {
            assert_eq!(surface_id.as_str(), "late-panel");
        }
        other => panic!("Expected snapshot push, got {other:?}"),
    }
}

/// **VALUE**: Verifies worker mutations fan out to subscribers only, tagged with
/// their origin.
///
/// **WHY THIS MATTERS**: Mutation fan-out is how every surface mirrors the
/// worker's state. Sending mutations to unsubscribed surfaces wastes the pipe;
/// echoing them back to the origin would double-apply every change.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Mutations reach surfaces that never subscribed
/// - The origin receives its own mutation back
/// - The origin tag is missing or wrong
#[tokio::test]
async fn given_mixed_subscribers_when_worker_mutates_then_only_subscribers_receive_it() {
    // GIVEN: a booted worker, one subscribed surface, one unsubscribed surface
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;
    let mut bystander = attach(port, "bystander", SurfaceRole::Other).await;

    send_frame(&mut worker, &ClientFrame::BootComplete).await;
    send_frame(&mut primary, &ClientFrame::Subscribe).await;

    // Drain the boot traffic so only the mutation is left to observe.
    match recv_frame(&mut primary).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished, got {other:?}"),
    }
    match recv_frame(&mut bystander).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::SnapshotPush { .. } => {}
        other => panic!("Expected snapshot push, got {other:?}"),
    }

    // WHEN: the worker emits a mutation
    send_frame(
        &mut worker,
        &ClientFrame::Mutation {
            mutation: json!({"type": "SET_VOLUME", "payload": 0.5}),
        },
    )
    .await;

    // THEN: the subscriber receives it tagged with the worker as origin
    match recv_frame(&mut primary).await {
        SurfaceFrame::Mutation { origin, mutation } => {
            assert_eq!(origin.as_str(), "worker");
            assert_eq!(mutation, json!({"type": "SET_VOLUME", "payload": 0.5}));
        }
        other => panic!("Expected mutation frame, got {other:?}"),
    }

    // AND: the unsubscribed surface and the worker itself hear nothing
    assert_no_frame(&mut bystander, Duration::from_millis(200)).await;
    assert_no_frame(&mut worker, Duration::from_millis(200)).await;
}

/// **VALUE**: Verifies mutations arrive at a subscriber in the order the worker
/// emitted them.
///
/// **WHY THIS MATTERS**: Mutations are deltas; applying them out of order
/// produces a state no surface ever agreed on. Ordering per origin is the core
/// guarantee that makes delta sync usable at all.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Fan-out reorders mutations from a single origin
/// - Some mutation in a burst is dropped
#[tokio::test]
async fn given_subscriber_when_worker_emits_burst_then_mutations_arrive_in_order() {
    // GIVEN: a booted worker and one subscribed surface
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    send_frame(&mut worker, &ClientFrame::BootComplete).await;
    send_frame(&mut primary, &ClientFrame::Subscribe).await;
    match recv_frame(&mut primary).await {
        SurfaceFrame::InitFinished => {}
        other => panic!("Expected initFinished, got {other:?}"),
    }

    // WHEN: the worker emits a burst of mutations
    for seq in 0..5 {
        send_frame(
            &mut worker,
            &ClientFrame::Mutation {
                mutation: json!({"seq": seq}),
            },
        )
        .await;
    }

    // THEN: the subscriber sees them in emission order
    for seq in 0..5 {
        match recv_frame(&mut primary).await {
            SurfaceFrame::Mutation { mutation, .. } => {
                assert_eq!(mutation, json!({"seq": seq}));
            }
            other => panic!("Expected mutation frame, got {other:?}"),
        }
    }
}
