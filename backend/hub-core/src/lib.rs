pub mod config;
pub mod error;
pub mod hub;
pub mod ipc;
pub mod proto;

#[cfg(test)]
mod tests;

pub const IPC_HOSTNAME: &str = "127.0.0.1";
pub const IPC_WS_BASE_URL: &str = const_format::concatcp!("ws://", IPC_HOSTNAME);
