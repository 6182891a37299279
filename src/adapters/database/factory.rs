//! Store factory
//!
//! Builds the primary and destination PostgreSQL adapters from configuration
//! and hands them out as trait objects.

use crate::adapters::database::traits::{CrmStore, EventLog, JobStorage, LeadSink, LeadSource};
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::LeadsyncConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Handles to both stores
#[derive(Clone)]
pub struct Stores {
    /// Primary store: leads source, job ledger, audit log and CRM tables
    pub primary: Arc<PostgreSQLAdapter>,
    /// Destination store receiving exported leads
    pub destination: Arc<PostgreSQLAdapter>,
}

impl Stores {
    pub fn lead_source(&self) -> Arc<dyn LeadSource + Send + Sync> {
        self.primary.clone()
    }

    pub fn lead_sink(&self) -> Arc<dyn LeadSink + Send + Sync> {
        self.destination.clone()
    }

    pub fn job_storage(&self) -> Arc<dyn JobStorage + Send + Sync> {
        self.primary.clone()
    }

    pub fn event_log(&self) -> Arc<dyn EventLog + Send + Sync> {
        self.primary.clone()
    }

    pub fn crm_store(&self) -> Arc<dyn CrmStore + Send + Sync> {
        self.primary.clone()
    }

    /// Sink for leads arriving through webhooks, which land in the primary store
    pub fn webhook_lead_sink(&self) -> Arc<dyn LeadSink + Send + Sync> {
        self.primary.clone()
    }

    /// Runs `SELECT 1` against both stores
    pub async fn test_connections(&self) -> Result<()> {
        self.primary.client().test_connection().await?;
        self.destination.client().test_connection().await
    }

    /// Applies the embedded schema to both stores
    pub async fn run_migrations(&self) -> Result<()> {
        self.primary.client().run_migrations().await?;
        self.destination.client().run_migrations().await
    }
}

/// Creates both stores
///
/// # Errors
///
/// Returns an error if either pool cannot be built or a configured
/// identifier is invalid.
pub fn create_stores(config: &LeadsyncConfig) -> Result<Stores> {
    tracing::info!("Creating PostgreSQL stores");

    let primary_client = Arc::new(PostgreSQLClient::new(&config.source.database)?);
    let primary = PostgreSQLAdapter::new(
        primary_client,
        config.source.leads_table.clone(),
        config.source.modified_column.clone(),
    )?;

    let destination_client = Arc::new(PostgreSQLClient::new(&config.destination.database)?);
    let destination = PostgreSQLAdapter::new(
        destination_client,
        config.destination.leads_table.clone(),
        "updated_at",
    )?;

    tracing::debug!(
        primary = %primary.client().connection_string_safe(),
        destination = %destination.client().connection_string_safe(),
        "Stores created"
    );

    Ok(Stores {
        primary: Arc::new(primary),
        destination: Arc::new(destination),
    })
}
