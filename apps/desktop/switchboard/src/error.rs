use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while wiring up the application.
///
/// These are surfaced only at startup; once the hub is running, failures are
/// recovered inside hub-core or end in the shutdown path.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SwitchboardError {
    /// Error from this app's own wiring (log dir, runtime, hooks)
    #[error("Switchboard Error: {message} {location}")]
    Switchboard {
        message: String,
        location: ErrorLocation,
    },

    /// Error from hub-core operations (config, gateway)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}
