use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum HubError {
    /// The hub actor task has stopped and can no longer accept commands.
    #[error("Hub Stopped Error: {message} {location}")]
    Stopped {
        message: String,
        location: ErrorLocation,
    },

    /// A request was issued while another request with the same id is pending.
    #[error("Duplicate Request Error: {message} {location}")]
    DuplicateRequest {
        message: String,
        location: ErrorLocation,
    },
}
