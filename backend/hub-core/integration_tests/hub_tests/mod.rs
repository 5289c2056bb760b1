mod helpers;

mod attach;
mod request_flow;
mod shutdown_flow;
mod sync_flow;
