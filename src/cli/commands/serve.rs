//! Serve command implementation
//!
//! Runs the HTTP server: Bitrix24 webhooks and job control. Jobs created or
//! resumed over HTTP run as background tasks of this process.

use super::{build_driver, connect, load_valid_config, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL};
use crate::adapters::bitrix::BitrixClient;
use crate::core::control::JobController;
use crate::core::state::JobLedger;
use crate::core::transform::BitrixFieldMap;
use crate::core::webhook::WebhookProcessor;
use crate::server::{self, AppState};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        let Some(bitrix) = config.bitrix.clone() else {
            eprintln!("The [bitrix] section is required to receive webhooks");
            return Ok(EXIT_CONFIG);
        };
        let crm = match BitrixClient::new(&bitrix) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                eprintln!("Invalid Bitrix24 configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let ledger = JobLedger::new(stores.job_storage());
        let driver = Arc::new(build_driver(&config, &stores, shutdown_signal.clone()));
        let controller = Arc::new(JobController::with_driver(ledger.clone(), driver));

        let webhooks = WebhookProcessor::new(
            crm,
            stores.crm_store(),
            stores.webhook_lead_sink(),
            stores.event_log(),
        )
        .with_field_map(BitrixFieldMap::with_overrides(&bitrix.lead_fields))
        .with_application_token(bitrix.application_token.clone());

        let state = AppState {
            ledger,
            controller,
            webhooks: Arc::new(webhooks),
        };

        let drain_timeout = Duration::from_secs(config.export.shutdown_timeout_secs);
        match server::serve(&config.server.bind_address(), state, shutdown_signal, drain_timeout)
            .await
        {
            Ok(()) => Ok(0),
            Err(e @ crate::domain::SyncError::Connection(_)) => {
                eprintln!("{e}");
                Ok(EXIT_CONNECTION)
            }
            Err(e) => {
                tracing::error!(error = %e, "Server failed");
                eprintln!("Server failed: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}
