//! CLI command implementations
//!
//! Commands return a process exit code: 0 success, 1 partial success,
//! 2 configuration error, 4 connection error, 5 fatal error, 130 interrupted.

pub mod export;
pub mod init;
pub mod job;
pub mod serve;
pub mod status;
pub mod validate;

use crate::adapters::database::{create_stores, Stores};
use crate::config::{load_config, LeadsyncConfig};
use crate::core::export::{BatchProcessor, DriverSettings, ExportDriver};
use crate::core::state::JobLedger;
use tokio::sync::watch;

pub(crate) const EXIT_CONFIG: i32 = 2;
pub(crate) const EXIT_CONNECTION: i32 = 4;
pub(crate) const EXIT_FATAL: i32 = 5;

/// Loads and validates the configuration, printing the failure
pub(crate) fn load_valid_config(config_path: &str) -> Result<LeadsyncConfig, i32> {
    let config = load_config(config_path).map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        eprintln!("Failed to load configuration: {e}");
        EXIT_CONFIG
    })?;

    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("Configuration validation failed: {e}");
        EXIT_CONFIG
    })?;

    Ok(config)
}

/// Builds both stores, checks they answer and applies the schema
pub(crate) async fn connect(config: &LeadsyncConfig) -> Result<Stores, i32> {
    let fail = |e: crate::domain::SyncError| {
        tracing::error!(error = %e, "Failed to connect to stores");
        eprintln!("Failed to connect to database: {e}");
        EXIT_CONNECTION
    };

    let stores = create_stores(config).map_err(fail)?;
    stores.test_connections().await.map_err(fail)?;
    stores.run_migrations().await.map_err(fail)?;
    Ok(stores)
}

/// Export driver wired to `stores`
pub(crate) fn build_driver(
    config: &LeadsyncConfig,
    stores: &Stores,
    shutdown: watch::Receiver<bool>,
) -> ExportDriver {
    let batch = BatchProcessor::new(stores.lead_sink(), stores.event_log(), config.dry_run());
    ExportDriver::new(
        JobLedger::new(stores.job_storage()),
        stores.lead_source(),
        batch,
        DriverSettings::from(&config.export),
        shutdown,
    )
}
