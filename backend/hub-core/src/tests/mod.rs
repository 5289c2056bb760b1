mod broker;
mod config;
mod proto;
mod registry;
mod sync;
