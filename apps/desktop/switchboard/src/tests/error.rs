// Unit tests for error module
// Tests error serialization (startup errors are reported as structured JSON)

use crate::error::SwitchboardError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Tests that errors can be serialized to JSON.
///
/// **WHY THIS MATTERS**: Startup failures are logged as structured JSON so the
/// log file stays machine-readable. If serialization breaks, failures become
/// opaque strings.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or if the error structure becomes non-serializable (e.g., adding a non-serializable field).
#[test]
fn given_switchboard_error_when_serialized_then_succeeds() {
    // GIVEN: A SwitchboardError
    let err = SwitchboardError::Core {
        message: String::from("Test"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&err);

    // THEN: Should succeed
    assert!(result.is_ok(), "Error should be serializable");

    // AND: Should contain the error data
    let json = result.unwrap();
    assert!(json.contains("Core"), "JSON should contain variant name");
    assert!(json.contains("Test"), "JSON should contain message");
}
