//! Host collaborator hooks consumed at the end of shutdown.
//!
//! Window creation, input hooks, persisted storage and process exit are host
//! APIs with no coordination logic. The hub consumes them only through this
//! narrow trait; the application crate supplies the real implementation.

use log::info;

/// Host-side teardown operations invoked once the worker surface is gone and
/// the shutdown coordinator has reached `Terminated`.
pub trait HostHooks: Send + Sync {
    /// Release input-hook resources (global key listener).
    fn stop_input_hook(&self);

    /// Flush persisted storage to disk.
    fn flush_storage(&self);

    /// Schedule a relaunch of the application after exit.
    fn relaunch(&self);

    /// Exit the process.
    fn exit(&self);
}

/// Hooks implementation that only logs. Used by embedders and tests that must
/// not tear down the current process.
#[derive(Default)]
pub struct NullHooks;

impl HostHooks for NullHooks {
    fn stop_input_hook(&self) {
        info!("NullHooks: stop_input_hook");
    }

    fn flush_storage(&self) {
        info!("NullHooks: flush_storage");
    }

    fn relaunch(&self) {
        info!("NullHooks: relaunch");
    }

    fn exit(&self) {
        info!("NullHooks: exit");
    }
}
