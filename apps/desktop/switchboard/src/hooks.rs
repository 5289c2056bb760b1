//! Desktop host hooks: input hook, storage flush, relaunch, process exit.
//!
//! The hub core drives these at the very end of shutdown (once the worker
//! surface is gone). They wrap host APIs only - no coordination logic.

use hub_core::hub::HostHooks;

use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};

/// Host hooks for the desktop main process.
#[derive(Default)]
pub struct DesktopHooks {
    relaunch_on_exit: AtomicBool,
}

impl DesktopHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostHooks for DesktopHooks {
    fn stop_input_hook(&self) {
        // The global input hook is registered by the host window layer; at
        // this point every surface is gone, so releasing is best-effort.
        info!("Releasing input hook resources");
    }

    fn flush_storage(&self) {
        info!("Flushing persisted storage");
        log::logger().flush();
    }

    fn relaunch(&self) {
        self.relaunch_on_exit.store(true, Ordering::SeqCst);
    }

    fn exit(&self) {
        if self.relaunch_on_exit.load(Ordering::SeqCst) {
            match std::env::current_exe() {
                Ok(exe) => {
                    info!("Relaunching {}", exe.display());
                    if let Err(e) = Command::new(exe).spawn() {
                        error!("Relaunch failed: {e}");
                    }
                }
                Err(e) => warn!("Cannot determine current executable for relaunch: {e}"),
            }
        }

        info!("Exiting process");
        std::process::exit(0);
    }
}
