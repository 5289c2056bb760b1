// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use switchboard::error::SwitchboardError;
use switchboard::hooks::DesktopHooks;
use switchboard::logger::initialize as LoggerInitialize;

use hub_core::config::HubConfig;
use hub_core::hub::start_hub;
use hub_core::ipc::start_ipc_server;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

fn main() -> Result<(), SwitchboardError> {
    let config = HubConfig::load().map_err(|e| SwitchboardError::Core {
        message: format!("Failed to load config: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let log_dir = log_dir(&config);
    create_dir_all(&log_dir).map_err(|e| SwitchboardError::Switchboard {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Switchboard main process starting");
    info!("Log directory: {}", log_dir.display());

    let runtime = tokio::runtime::Runtime::new().map_err(|e| SwitchboardError::Switchboard {
        message: format!("Failed to start async runtime: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    runtime.block_on(run(config))
}

async fn run(config: HubConfig) -> Result<(), SwitchboardError> {
    let hooks = Arc::new(DesktopHooks::new());
    let hub = start_hub(&config, hooks);

    info!("Starting IPC gateway on port {}", config.ipc_port);
    let ipc_handle =
        start_ipc_server(config.ipc_port, hub.clone())
            .await
            .map_err(|e| SwitchboardError::Core {
                message: format!("Failed to start IPC gateway: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
    info!("IPC gateway ready on {}", ipc_handle.local_addr);

    // The process normally ends inside the host exit hook once shutdown
    // terminates. Ctrl-C routes through the orderly path: a close request on
    // the primary surface.
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Ctrl-C handler unavailable; parking main task");
            std::future::pending::<()>().await;
        }

        info!("Ctrl-C received; requesting primary surface close");
        let table = hub.surface_table().await.unwrap_or_default();
        let primary = table
            .iter()
            .find(|(_, role)| *role == hub_core::proto::SurfaceRole::Primary)
            .map(|(id, _)| id.clone());

        match primary {
            Some(id) => {
                let _ = hub.close_requested(id).await;
            }
            None => {
                info!("No primary surface attached; exiting");
                return Ok(());
            }
        }
    }
}

fn log_dir(config: &HubConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("switchboard")
}
