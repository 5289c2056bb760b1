//! Shared leaf types for the switchboard workspace.
//!
//! This crate contains small data types used by every layer. It has no
//! business logic - just types that can be passed between crates without
//! pulling in the coordination layer.
//!
//! ## Architecture
//!
//! - **common** (this crate): Shared leaf types
//! - **hub-core**: Coordination logic between surfaces and the worker
//! - **switchboard**: Application wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
