use crate::hub_tests::helpers::{
    RecordingHooks, assert_no_frame, attach, recv_frame, send_frame, start_test_server,
};

use hub_core::config::HubConfig;
use hub_core::proto::{ClientFrame, CloseDecision, SurfaceFrame, SurfaceRole};

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// **VALUE**: Verifies closing the primary surface vetoes the close and starts a
/// graceful worker shutdown instead.
///
/// **WHY THIS MATTERS**: The primary's close button is the real shutdown entry
/// point. Letting the window die immediately would orphan the worker mid-write;
/// the hub must intercept, keep the window alive, and give the worker its
/// shutdown notice first.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The primary close is allowed while shutdown has not run
/// - The worker never receives its shutdown notice
#[tokio::test]
async fn given_running_hub_when_primary_closes_then_veto_and_worker_notified() {
    // GIVEN: a worker and a primary attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: the primary asks to close
    send_frame(&mut primary, &ClientFrame::CloseRequested).await;

    // THEN: the close is vetoed
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseDecision { decision } => {
            assert_eq!(decision, CloseDecision::Veto, "First primary close is vetoed");
        }
        other => panic!("Expected close decision, got {other:?}"),
    }

    // AND: the worker receives the shutdown notice
    match recv_frame(&mut worker).await {
        SurfaceFrame::ShutdownNotice => {}
        other => panic!("Expected shutdown notice, got {other:?}"),
    }
}

/// **VALUE**: Verifies the cooperative shutdown path: notice, ack, completion,
/// then force-close of both windows.
///
/// **WHY THIS MATTERS**: This is the happy path every normal quit takes. The
/// worker's ack cancels the force timer and its completion signal is what
/// finally lets the windows close. Breaking any link leaves the app either
/// hung open or killed mid-flush.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The ack is ignored or mis-ordered against the notice
/// - Completion fails to force-close the primary or the worker
#[tokio::test]
async fn given_shutdown_notice_when_worker_acks_and_completes_then_both_surfaces_force_closed() {
    // GIVEN: a shutdown in progress after the primary asked to close
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseDecision { decision } => assert_eq!(decision, CloseDecision::Veto),
        other => panic!("Expected close decision, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::ShutdownNotice => {}
        other => panic!("Expected shutdown notice, got {other:?}"),
    }

    // WHEN: the worker acknowledges and later reports completion
    send_frame(&mut worker, &ClientFrame::ShutdownAck).await;
    send_frame(&mut worker, &ClientFrame::ShutdownComplete).await;

    // THEN: both surfaces are told to close unconditionally
    match recv_frame(&mut primary).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close at the primary, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close at the worker, got {other:?}"),
    }
}

/// **VALUE**: Verifies an unresponsive worker is force-closed when the shutdown
/// timer expires, and the primary may then close freely.
///
/// **WHY THIS MATTERS**: A wedged worker must not hold the whole app hostage.
/// The timer is the escape hatch that turns a graceful shutdown into a forced
/// one after a bounded wait.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The force timer never fires
/// - The forced path fails to close both surfaces
/// - The primary is still vetoed after shutdown was forced
#[tokio::test]
async fn given_silent_worker_when_shutdown_timer_fires_then_close_is_forced() {
    // GIVEN: a one-second shutdown timeout and a worker that never acks
    let config = HubConfig {
        shutdown_timeout_secs: 1,
        ..HubConfig::default()
    };
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(config, hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: the primary asks to close and the worker stays silent
    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseDecision { decision } => assert_eq!(decision, CloseDecision::Veto),
        other => panic!("Expected close decision, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::ShutdownNotice => {}
        other => panic!("Expected shutdown notice, got {other:?}"),
    }

    // THEN: the timer forces both surfaces closed
    match recv_frame(&mut primary).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close at the primary, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close at the worker, got {other:?}"),
    }

    // AND: a repeated primary close is now allowed
    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseDecision { decision } => {
            assert_eq!(decision, CloseDecision::Allow, "Forced shutdown unlocks the close");
        }
        other => panic!("Expected close decision, got {other:?}"),
    }
}

/// **VALUE**: Verifies closing a secondary surface hides it and redirects the
/// close to the primary instead of starting shutdown.
///
/// **WHY THIS MATTERS**: Secondary surfaces are expensive to rebuild, so their
/// close button hides them. The user's intent to quit still has to land
/// somewhere, so the hub forwards the close request to the primary.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A secondary close starts a shutdown on its own
/// - The hide verdict is wrong, destroying the window
/// - The redirect to the primary is dropped
#[tokio::test]
async fn given_running_hub_when_secondary_closes_then_hidden_and_close_redirected_to_primary() {
    // GIVEN: a worker, a primary, and a secondary attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;
    let mut panel = attach(port, "panel", SurfaceRole::Secondary).await;

    // WHEN: the secondary asks to close
    send_frame(&mut panel, &ClientFrame::CloseRequested).await;

    // THEN: it is told to hide rather than die
    match recv_frame(&mut panel).await {
        SurfaceFrame::CloseDecision { decision } => {
            assert_eq!(decision, CloseDecision::VetoAndHide);
        }
        other => panic!("Expected close decision, got {other:?}"),
    }

    // AND: the close request lands at the primary
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseRequest => {}
        other => panic!("Expected redirected close request, got {other:?}"),
    }

    // AND: no shutdown is started
    assert_no_frame(&mut worker, Duration::from_millis(200)).await;
}

/// **VALUE**: Verifies the worker cannot close itself while the hub is running.
///
/// **WHY THIS MATTERS**: The worker holds the authoritative state; letting it
/// close outside an orderly shutdown would strand every surface. A worker
/// close attempt is treated as the user's intent to quit and rerouted to the
/// primary.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The worker is allowed to close mid-session
/// - The redirect to the primary is dropped
#[tokio::test]
async fn given_running_hub_when_worker_closes_then_vetoed_and_redirected_to_primary() {
    // GIVEN: a worker and a primary attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: the worker asks to close
    send_frame(&mut worker, &ClientFrame::CloseRequested).await;

    // THEN: the close is vetoed
    match recv_frame(&mut worker).await {
        SurfaceFrame::CloseDecision { decision } => {
            assert_eq!(decision, CloseDecision::Veto);
        }
        other => panic!("Expected close decision, got {other:?}"),
    }

    // AND: the primary is asked to close instead
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseRequest => {}
        other => panic!("Expected redirected close request, got {other:?}"),
    }
}

/// **VALUE**: Verifies host teardown hooks run when the worker disconnects after
/// shutdown finished.
///
/// **WHY THIS MATTERS**: Stopping the input hook, flushing storage, and exiting
/// the process are the last things the host does, and they must wait for the
/// worker to actually go away. Running them early corrupts storage; never
/// running them leaves a zombie process.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Teardown hooks fire before shutdown terminated
/// - The worker's disconnect fails to trigger teardown
/// - A plain exit spuriously relaunches the app
#[tokio::test]
async fn given_terminated_shutdown_when_worker_disconnects_then_host_teardown_runs() {
    // GIVEN: a completed shutdown
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), Arc::clone(&hooks)).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut worker).await {
        SurfaceFrame::ShutdownNotice => {}
        other => panic!("Expected shutdown notice, got {other:?}"),
    }
    send_frame(&mut worker, &ClientFrame::ShutdownAck).await;
    send_frame(&mut worker, &ClientFrame::ShutdownComplete).await;
    match recv_frame(&mut worker).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close, got {other:?}"),
    }

    // Teardown must not have run while the worker is still connected.
    assert!(!hooks.exited.load(Ordering::SeqCst));

    // WHEN: the worker connection drops
    drop(worker);

    // THEN: the host teardown hooks run
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !hooks.exited.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(hooks.input_hook_stopped.load(Ordering::SeqCst), "Input hook should stop");
    assert!(hooks.storage_flushed.load(Ordering::SeqCst), "Storage should flush");
    assert!(hooks.exited.load(Ordering::SeqCst), "Process exit hook should run");
    assert!(!hooks.relaunched.load(Ordering::SeqCst), "Plain quit never relaunches");
}

/// **VALUE**: Verifies a worker that acks and then dies still drives the
/// shutdown to completion instead of hanging the app.
///
/// **WHY THIS MATTERS**: The ack cancels the force timer, so after it the
/// worker's completion signal is the only thing that closes the windows. If
/// the worker crashes in that window, nothing else can ever arrive from it;
/// its disconnect has to stand in for completion or the app hangs forever
/// with every later close vetoed.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A worker disconnect during the post-ack wait is only logged
/// - Termination is never reached, leaving the primary vetoed forever
/// - Host teardown never runs because no completion signal arrives
#[tokio::test]
async fn given_acked_shutdown_when_worker_dies_then_termination_completes() {
    // GIVEN: A shutdown where the worker acked the notice
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), Arc::clone(&hooks)).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseDecision { decision } => assert_eq!(decision, CloseDecision::Veto),
        other => panic!("Expected close decision, got {other:?}"),
    }
    match recv_frame(&mut worker).await {
        SurfaceFrame::ShutdownNotice => {}
        other => panic!("Expected shutdown notice, got {other:?}"),
    }
    send_frame(&mut worker, &ClientFrame::ShutdownAck).await;

    // WHEN: The worker crashes before reporting completion
    drop(worker);

    // THEN: The primary is still closed
    match recv_frame(&mut primary).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close at the primary, got {other:?}"),
    }

    // AND: Host teardown runs
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !hooks.exited.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(hooks.exited.load(Ordering::SeqCst), "Teardown must run after worker death");
    assert!(hooks.storage_flushed.load(Ordering::SeqCst), "Storage should flush");
}

/// **VALUE**: Verifies shutdown forced against an already-dead worker still
/// exits the process.
///
/// **WHY THIS MATTERS**: When the worker crashed before shutdown even began,
/// the forced path reaches `Terminated` with no worker left to disconnect.
/// Waiting for a close event from it would wait forever; teardown has to run
/// the moment termination is reached with no worker attached.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Teardown only ever triggers on a worker close event
/// - A pre-shutdown worker crash leaves a zombie process after the timer fires
#[tokio::test]
async fn given_dead_worker_when_shutdown_forced_then_teardown_still_runs() {
    // GIVEN: A one-second shutdown timeout and a worker that already crashed
    let config = HubConfig {
        shutdown_timeout_secs: 1,
        ..HubConfig::default()
    };
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(config, Arc::clone(&hooks)).await;

    let worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    drop(worker);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // WHEN: The primary asks to close and the forced path runs its course
    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseDecision { decision } => assert_eq!(decision, CloseDecision::Veto),
        other => panic!("Expected close decision, got {other:?}"),
    }

    // THEN: The timer still forces the primary closed
    match recv_frame(&mut primary).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close at the primary, got {other:?}"),
    }

    // AND: Host teardown runs without any worker close event
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !hooks.exited.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(hooks.exited.load(Ordering::SeqCst), "Teardown must not wait on a dead worker");
}

/// **VALUE**: Verifies a surface-issued restart rides the orderly shutdown
/// path and ends in a relaunch.
///
/// **WHY THIS MATTERS**: Restart is a user-facing feature with no UI of its
/// own in the hub; surfaces request it over the wire. It must reuse the single
/// shutdown entry point (a close on the primary) rather than inventing a
/// second termination path.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The restart frame is not dispatched at the gateway
/// - The relaunch flag is lost before teardown
/// - Restart bypasses the graceful worker shutdown
#[tokio::test]
async fn given_restart_frame_when_shutdown_completes_then_relaunch_hook_runs() {
    // GIVEN: A worker and a primary attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), Arc::clone(&hooks)).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: A surface requests a restart
    send_frame(&mut primary, &ClientFrame::Restart).await;

    // THEN: The close request is routed to the primary, the shutdown entry point
    match recv_frame(&mut primary).await {
        SurfaceFrame::CloseRequest => {}
        other => panic!("Expected close request at the primary, got {other:?}"),
    }

    // WHEN: The primary acts on it and the worker shuts down cleanly
    send_frame(&mut primary, &ClientFrame::CloseRequested).await;
    match recv_frame(&mut worker).await {
        SurfaceFrame::ShutdownNotice => {}
        other => panic!("Expected shutdown notice, got {other:?}"),
    }
    send_frame(&mut worker, &ClientFrame::ShutdownAck).await;
    send_frame(&mut worker, &ClientFrame::ShutdownComplete).await;
    match recv_frame(&mut worker).await {
        SurfaceFrame::ForceClose => {}
        other => panic!("Expected force close, got {other:?}"),
    }
    drop(worker);

    // THEN: Teardown relaunches before exiting
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !hooks.exited.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(hooks.relaunched.load(Ordering::SeqCst), "Restart must set the relaunch flag");
    assert!(hooks.exited.load(Ordering::SeqCst), "Process exit hook should run");
}
