// Unit tests for the request broker: correlation, exactly-once delivery,
// duplicate/unmatched handling and the bounded pending lifetime.

use crate::error::hub::HubError;
use crate::hub::broker::{PendingCaller, RequestBroker};
use crate::hub::registry::SurfaceRegistry;
use crate::proto::{RequestEnvelope, RequestParams, ResponseEnvelope, SurfaceFrame, SurfaceId, SurfaceRole};

use serde_json::json;
use tokio::sync::{mpsc, oneshot};

fn request(id: &str) -> RequestEnvelope {
    RequestEnvelope {
        id: id.to_string(),
        method: "fetch".to_string(),
        params: RequestParams {
            resource: "scenes".to_string(),
            args: vec![],
        },
    }
}

fn surface(
    registry: &mut SurfaceRegistry,
    id: &str,
    role: SurfaceRole,
) -> mpsc::UnboundedReceiver<SurfaceFrame> {
    let (tx, rx) = mpsc::unbounded_channel();
    registry.register(SurfaceId::new(id), role, tx);
    rx
}

#[tokio::test]
async fn given_blocking_call_when_response_arrives_then_caller_resolved_exactly_once() {
    // GIVEN: A worker and a pending blocking call
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut broker = RequestBroker::new();

    let (tx, rx) = oneshot::channel();
    broker
        .send(&registry, request("r1"), PendingCaller::Blocking(tx))
        .unwrap();

    // THEN: The envelope was forwarded to the worker
    assert!(matches!(
        worker_rx.try_recv(),
        Ok(SurfaceFrame::Request { request }) if request.id == "r1"
    ));

    // WHEN: The response arrives
    broker.on_response(&registry, ResponseEnvelope::result("r1", json!(42)));

    // THEN: The caller is resolved and the entry removed
    let response = rx.await.unwrap();
    assert_eq!(response.result, Some(json!(42)));
    assert_eq!(broker.pending_len(), 0);

    // WHEN: A duplicate response arrives
    broker.on_response(&registry, ResponseEnvelope::result("r1", json!(43)));

    // THEN: It is dropped silently; there is no pending entry to re-deliver
    assert_eq!(broker.pending_len(), 0);
}

#[tokio::test]
async fn given_nonblocking_call_when_response_arrives_then_origin_receives_frame() {
    let mut registry = SurfaceRegistry::new();
    let _worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut origin_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut broker = RequestBroker::new();

    broker
        .send(
            &registry,
            request("r2"),
            PendingCaller::NonBlocking(SurfaceId::new("primary")),
        )
        .unwrap();

    broker.on_response(&registry, ResponseEnvelope::result("r2", json!("ok")));

    assert!(matches!(
        origin_rx.try_recv(),
        Ok(SurfaceFrame::Response { response }) if response.id == "r2"
    ));
}

#[tokio::test]
async fn given_no_pending_entry_when_response_arrives_then_dropped() {
    let registry = SurfaceRegistry::new();
    let mut broker = RequestBroker::new();

    // Unmatched responses are dropped and logged, never an error
    broker.on_response(&registry, ResponseEnvelope::result("ghost", json!(1)));
    assert_eq!(broker.pending_len(), 0);
}

#[tokio::test]
async fn given_pending_id_when_same_id_sent_again_then_rejected() {
    let mut registry = SurfaceRegistry::new();
    let _worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut broker = RequestBroker::new();

    let (tx1, _rx1) = oneshot::channel();
    broker
        .send(&registry, request("dup"), PendingCaller::Blocking(tx1))
        .unwrap();

    let (tx2, _rx2) = oneshot::channel();
    let result = broker.send(&registry, request("dup"), PendingCaller::Blocking(tx2));

    assert!(matches!(result, Err(HubError::DuplicateRequest { .. })));
    assert_eq!(broker.pending_len(), 1, "Original entry must survive");
}

#[tokio::test]
async fn given_unreachable_worker_when_sent_then_entry_kept_until_expiry() {
    // GIVEN: No worker attached at all
    let registry = SurfaceRegistry::new();
    let mut broker = RequestBroker::new();

    // WHEN: A call is issued
    let (tx, rx) = oneshot::channel();
    broker
        .send(&registry, request("orphan"), PendingCaller::Blocking(tx))
        .unwrap();

    // THEN: Forwarding failed but the entry remains (no retry, no removal)
    assert_eq!(broker.pending_len(), 1);

    // WHEN: The bound elapses
    broker.expire(&registry, "orphan");

    // THEN: The caller gets a definite timeout error
    let response = rx.await.unwrap();
    assert_eq!(response.error, Some(json!("request timed out")));
    assert_eq!(broker.pending_len(), 0);

    // Expiring again is a no-op
    broker.expire(&registry, "orphan");
}

#[tokio::test]
async fn given_resolved_request_when_expiry_fires_late_then_noop() {
    let mut registry = SurfaceRegistry::new();
    let _worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut broker = RequestBroker::new();

    let (tx, rx) = oneshot::channel();
    broker
        .send(&registry, request("r3"), PendingCaller::Blocking(tx))
        .unwrap();
    broker.on_response(&registry, ResponseEnvelope::result("r3", json!(true)));
    assert_eq!(rx.await.unwrap().result, Some(json!(true)));

    // Stale timer fire after normal resolution must not re-deliver
    broker.expire(&registry, "r3");
}

#[tokio::test]
async fn given_fire_and_forget_message_when_forwarded_then_worker_and_origin_excluded() {
    let mut registry = SurfaceRegistry::new();
    let mut worker_rx = surface(&mut registry, "worker", SurfaceRole::Worker);
    let mut origin_rx = surface(&mut registry, "primary", SurfaceRole::Primary);
    let mut other_rx = surface(&mut registry, "settings", SurfaceRole::Secondary);
    let broker = RequestBroker::new();

    broker.on_message(&registry, &SurfaceId::new("primary"), json!({"k": "v"}));

    assert!(matches!(
        other_rx.try_recv(),
        Ok(SurfaceFrame::Message { .. })
    ));
    assert!(worker_rx.try_recv().is_err(), "Worker must be excluded");
    assert!(origin_rx.try_recv().is_err(), "Origin must be excluded");
}
