use crate::hub_tests::helpers::{
    RecordingHooks, assert_no_frame, attach, recv_frame, send_frame, start_test_server,
};

use hub_core::config::HubConfig;
use hub_core::proto::{
    CallerMode, ClientFrame, RequestEnvelope, ResponseEnvelope, SurfaceFrame, SurfaceRole,
};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

/// **VALUE**: Verifies a blocking call travels surface → hub → worker → hub → surface.
///
/// **WHY THIS MATTERS**: Every service call a surface makes rides this path.
/// The broker must forward the request to the worker verbatim and route the
/// worker's response back to the caller by id. If correlation breaks, blocking
/// callers hang forever.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The request never reaches the worker, or arrives mangled
/// - The response is delivered to the wrong surface
/// - Request/response correlation by id is broken
#[tokio::test]
async fn given_worker_attached_when_blocking_call_sent_then_caller_receives_response() {
    // GIVEN: a worker and a primary surface attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: the primary issues a blocking call
    let request = RequestEnvelope::new("fetchScenes", "ScenesService", vec![json!(3)]);
    let request_id = request.id.clone();
    send_frame(
        &mut primary,
        &ClientFrame::Call {
            mode: CallerMode::Blocking,
            request,
        },
    )
    .await;

    // THEN: the worker receives the forwarded request intact
    let forwarded = match recv_frame(&mut worker).await {
        SurfaceFrame::Request { request } => request,
        other => panic!("Expected request frame at the worker, got {other:?}"),
    };
    assert_eq!(forwarded.id, request_id, "Request id should survive forwarding");
    assert_eq!(forwarded.method, "fetchScenes");
    assert_eq!(forwarded.params.resource, "ScenesService");

    // WHEN: the worker answers
    send_frame(
        &mut worker,
        &ClientFrame::Response {
            response: ResponseEnvelope::result(&forwarded.id, json!({"scenes": []})),
        },
    )
    .await;

    // THEN: the caller receives the response with the matching id
    match recv_frame(&mut primary).await {
        SurfaceFrame::Response { response } => {
            assert_eq!(response.id, request_id, "Response id should match the call");
            assert_eq!(response.result, Some(json!({"scenes": []})));
            assert!(response.error.is_none());
        }
        other => panic!("Expected response frame at the caller, got {other:?}"),
    }
}

/// **VALUE**: Verifies a non-blocking call delivers its response as a later frame.
///
/// **WHY THIS MATTERS**: Non-blocking callers keep processing other frames while
/// the worker handles their request. The broker has to remember which surface
/// asked and push the response to it out of band.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Non-blocking responses are dropped instead of routed to the origin
/// - The routing confuses non-blocking with blocking delivery
#[tokio::test]
async fn given_worker_attached_when_nonblocking_call_sent_then_origin_receives_response_frame() {
    // GIVEN: a worker and a secondary surface attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut panel = attach(port, "panel", SurfaceRole::Secondary).await;

    // WHEN: the panel issues a non-blocking call and the worker answers
    let request = RequestEnvelope::new("mute", "AudioService", vec![json!("mic")]);
    let request_id = request.id.clone();
    send_frame(
        &mut panel,
        &ClientFrame::Call {
            mode: CallerMode::NonBlocking,
            request,
        },
    )
    .await;

    let forwarded = match recv_frame(&mut worker).await {
        SurfaceFrame::Request { request } => request,
        other => panic!("Expected request frame at the worker, got {other:?}"),
    };
    send_frame(
        &mut worker,
        &ClientFrame::Response {
            response: ResponseEnvelope::result(&forwarded.id, json!(true)),
        },
    )
    .await;

    // THEN: the origin receives the response frame
    match recv_frame(&mut panel).await {
        SurfaceFrame::Response { response } => {
            assert_eq!(response.id, request_id);
            assert_eq!(response.result, Some(json!(true)));
        }
        other => panic!("Expected response frame at the origin, got {other:?}"),
    }
}

/// **VALUE**: Verifies an unmatched response is dropped without disturbing later calls.
///
/// **WHY THIS MATTERS**: Responses can arrive after their request already timed
/// out. The broker must discard them silently; crashing or misrouting on a
/// stale id would let one slow request poison the whole connection.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - An unknown response id panics the hub or kills the connection
/// - A stale response is delivered to some unrelated pending caller
#[tokio::test]
async fn given_no_pending_request_when_response_arrives_then_it_is_dropped_and_calls_still_work() {
    // GIVEN: a worker and a primary surface attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: the worker sends a response nobody asked for
    send_frame(
        &mut worker,
        &ClientFrame::Response {
            response: ResponseEnvelope::result("no-such-request", json!(null)),
        },
    )
    .await;

    // THEN: nothing reaches the primary
    assert_no_frame(&mut primary, Duration::from_millis(200)).await;

    // AND: a subsequent call still completes normally
    let request = RequestEnvelope::new("ping", "SystemService", vec![]);
    let request_id = request.id.clone();
    send_frame(
        &mut primary,
        &ClientFrame::Call {
            mode: CallerMode::Blocking,
            request,
        },
    )
    .await;

    let forwarded = match recv_frame(&mut worker).await {
        SurfaceFrame::Request { request } => request,
        other => panic!("Expected request frame at the worker, got {other:?}"),
    };
    send_frame(
        &mut worker,
        &ClientFrame::Response {
            response: ResponseEnvelope::result(&forwarded.id, json!("pong")),
        },
    )
    .await;

    match recv_frame(&mut primary).await {
        SurfaceFrame::Response { response } => {
            assert_eq!(response.id, request_id);
            assert_eq!(response.result, Some(json!("pong")));
        }
        other => panic!("Expected response frame, got {other:?}"),
    }
}

/// **VALUE**: Verifies a request the worker never answers resolves with a timeout error.
///
/// **WHY THIS MATTERS**: A blocking caller is frozen until its response
/// arrives. Without the timeout backstop, a wedged worker would hang the
/// calling surface indefinitely with no way to recover.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The expiry timer never fires or fires for the wrong request
/// - The timeout resolves the caller with a success payload
/// - The pending entry leaks and blocks reuse of the id
#[tokio::test]
async fn given_silent_worker_when_request_times_out_then_caller_receives_error_response() {
    // GIVEN: a hub with a one-second request timeout and a worker that never answers
    let config = HubConfig {
        request_timeout_secs: 1,
        ..HubConfig::default()
    };
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(config, hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;

    // WHEN: the primary issues a blocking call that is never answered
    let request = RequestEnvelope::new("fetchScenes", "ScenesService", vec![]);
    let request_id = request.id.clone();
    send_frame(
        &mut primary,
        &ClientFrame::Call {
            mode: CallerMode::Blocking,
            request,
        },
    )
    .await;

    // The worker sees the request but stays silent.
    match recv_frame(&mut worker).await {
        SurfaceFrame::Request { .. } => {}
        other => panic!("Expected request frame at the worker, got {other:?}"),
    }

    // THEN: the caller is resolved with a timeout error
    match recv_frame(&mut primary).await {
        SurfaceFrame::Response { response } => {
            assert_eq!(response.id, request_id);
            assert!(response.result.is_none());
            assert_eq!(response.error, Some(json!("request timed out")));
        }
        other => panic!("Expected response frame, got {other:?}"),
    }
}

/// **VALUE**: Verifies fire-and-forget messages fan out to every surface except
/// the origin and the worker.
///
/// **WHY THIS MATTERS**: Surfaces use broadcast messages to coordinate with
/// each other without involving the worker. Echoing the message back to the
/// sender would cause feedback loops in surface-side handlers.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The origin receives its own broadcast back
/// - The worker receives surface-to-surface chatter
/// - Some attached surface is skipped in the fan-out
#[tokio::test]
async fn given_three_surfaces_when_message_broadcast_then_only_other_surfaces_receive_it() {
    // GIVEN: a worker, a primary, and a secondary attached to the hub
    let hooks = Arc::new(RecordingHooks::default());
    let (port, _hub) = start_test_server(HubConfig::default(), hooks).await;

    let mut worker = attach(port, "worker", SurfaceRole::Worker).await;
    let mut primary = attach(port, "primary", SurfaceRole::Primary).await;
    let mut panel = attach(port, "panel", SurfaceRole::Secondary).await;

    // WHEN: the primary broadcasts a message
    send_frame(
        &mut primary,
        &ClientFrame::Message {
            payload: json!({"event": "themeChanged"}),
        },
    )
    .await;

    // THEN: the secondary receives it
    match recv_frame(&mut panel).await {
        SurfaceFrame::Message { payload } => {
            assert_eq!(payload, json!({"event": "themeChanged"}));
        }
        other => panic!("Expected message frame, got {other:?}"),
    }

    // AND: neither the origin nor the worker hears it
    assert_no_frame(&mut primary, Duration::from_millis(200)).await;
    assert_no_frame(&mut worker, Duration::from_millis(200)).await;
}
