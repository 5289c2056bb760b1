// Wire-shape tests: the JSON field names are the contract with surface
// processes, so they are asserted literally here.

use crate::proto::{
    CallerMode, ClientFrame, RequestEnvelope, RequestParams, SurfaceFrame, SurfaceId,
};

use serde_json::json;

#[test]
fn given_call_frame_json_when_decoded_then_envelope_fields_mapped() {
    let raw = r#"{
        "type": "call",
        "mode": "blocking",
        "id": "req-1",
        "method": "fetch",
        "params": { "resource": "scenes", "args": [1, "two"] }
    }"#;

    let frame: ClientFrame = serde_json::from_str(raw).unwrap();
    match frame {
        ClientFrame::Call { mode, request } => {
            assert_eq!(mode, CallerMode::Blocking);
            assert_eq!(request.id, "req-1");
            assert_eq!(request.method, "fetch");
            assert_eq!(request.params.resource, "scenes");
            assert_eq!(request.params.args, vec![json!(1), json!("two")]);
        }
        other => panic!("Expected call frame, got {other:?}"),
    }
}

#[test]
fn given_request_frame_when_encoded_then_envelope_flattened() {
    let frame = SurfaceFrame::Request {
        request: RequestEnvelope {
            id: "req-2".to_string(),
            method: "mute".to_string(),
            params: RequestParams {
                resource: "audio".to_string(),
                args: vec![json!(true)],
            },
        },
    };

    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "request",
            "id": "req-2",
            "method": "mute",
            "params": { "resource": "audio", "args": [true] }
        })
    );
}

#[test]
fn given_mutation_frame_when_encoded_then_origin_and_mutation_on_the_wire() {
    let frame = SurfaceFrame::Mutation {
        origin: SurfaceId::new("primary"),
        mutation: json!({ "path": "scenes.active", "value": 3 }),
    };

    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "mutation",
            "origin": "primary",
            "mutation": { "path": "scenes.active", "value": 3 }
        })
    );
}

#[test]
fn given_unit_frames_when_decoded_then_tag_alone_suffices() {
    assert!(matches!(
        serde_json::from_str(r#"{"type":"subscribe"}"#).unwrap(),
        ClientFrame::Subscribe
    ));
    assert!(matches!(
        serde_json::from_str(r#"{"type":"bootComplete"}"#).unwrap(),
        ClientFrame::BootComplete
    ));
    assert!(matches!(
        serde_json::from_str(r#"{"type":"shutdownAck"}"#).unwrap(),
        ClientFrame::ShutdownAck
    ));
    assert!(matches!(
        serde_json::from_str(r#"{"type":"restart"}"#).unwrap(),
        ClientFrame::Restart
    ));
}

#[test]
fn given_response_without_result_when_encoded_then_absent_fields_omitted() {
    let frame = SurfaceFrame::Response {
        response: crate::proto::ResponseEnvelope::error("req-3", json!("boom")),
    };

    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(
        value,
        json!({ "type": "response", "id": "req-3", "error": "boom" })
    );
}

#[test]
fn given_snapshot_push_when_encoded_then_camel_case_surface_id() {
    let frame = SurfaceFrame::SnapshotPush {
        surface_id: SurfaceId::new("settings"),
    };

    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(
        value,
        json!({ "type": "snapshotPush", "surfaceId": "settings" })
    );
}
