pub mod config;
pub mod hub;
pub mod ipc;
