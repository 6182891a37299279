//! Storage traits
//!
//! Each concern the core needs from a store is its own trait so the driver,
//! the ledger and the webhook processor depend only on what they use. The
//! PostgreSQL adapter implements all of them; so does the in-memory store
//! used in tests.

use crate::core::state::job::ExportJob;
use crate::domain::crm::{Deal, Negotiation, NegotiationStatus};
use crate::domain::event::SyncEvent;
use crate::domain::ids::{DealId, JobId, LeadId};
use crate::domain::lead::{Lead, RawLead};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Reads leads from the primary store
#[async_trait]
pub trait LeadSource: Send + Sync {
    /// Returns up to `limit` leads whose modification timestamp lies in
    /// `[from, to)`, ordered by modification time then id, skipping the
    /// first `offset`
    async fn fetch_modified_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RawLead>>;
}

/// Writes typed leads, keyed by id
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Inserts or replaces the row with `lead.id`; `source` is stored in
    /// `sync_source`
    async fn upsert_lead(&self, lead: &Lead, source: &str) -> Result<()>;
}

/// Persists export job rows
#[async_trait]
pub trait JobStorage: Send + Sync {
    async fn insert_job(&self, job: &ExportJob) -> Result<()>;

    async fn load_job(&self, job_id: JobId) -> Result<Option<ExportJob>>;

    /// Writes the status columns only: `status`, `pause_reason`, `last_error`,
    /// `started_at`, `completed_at`, `updated_at`
    async fn save_status(&self, job: &ExportJob) -> Result<()>;

    /// Writes the progress columns only: cursor, offset, counters,
    /// `last_completed_date`, `updated_at`
    async fn save_progress(&self, job: &ExportJob) -> Result<()>;

    /// Most recently created first
    async fn list_jobs(&self, limit: usize) -> Result<Vec<ExportJob>>;
}

/// Append-only audit log
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: &SyncEvent) -> Result<()>;
}

/// CRM tables maintained by the webhook handlers
#[async_trait]
pub trait CrmStore: Send + Sync {
    async fn upsert_deal(&self, deal: &Deal) -> Result<()>;

    async fn upsert_negotiation(&self, negotiation: &Negotiation) -> Result<()>;

    /// Returns the number of rows removed
    async fn delete_negotiations_for_deal(&self, deal_id: DealId) -> Result<u64>;

    /// Returns the number of rows removed
    async fn delete_deal(&self, deal_id: DealId) -> Result<u64>;

    /// Returns the number of rows removed
    async fn delete_lead(&self, lead_id: LeadId) -> Result<u64>;

    /// Per-pipeline stage overrides from `pipeline_configs`, keyed by stage id
    /// without the `C{n}:` prefix. Empty when the pipeline has no row.
    async fn load_stage_overrides(
        &self,
        category_id: &str,
    ) -> Result<HashMap<String, NegotiationStatus>>;
}
