//! Job ledger
//!
//! All reads and writes of [`ExportJob`] rows go through [`JobLedger`]. Status
//! changes are checked against the transition table; progress writes touch
//! only the cursor and counter columns.

use crate::adapters::database::traits::JobStorage;
use crate::core::state::job::{ExportJob, JobStatus};
use crate::domain::ids::JobId;
use crate::domain::{Result, SyncError};
use chrono::NaiveDate;
use std::sync::Arc;

/// Job ledger backed by a [`JobStorage`]
#[derive(Clone)]
pub struct JobLedger {
    storage: Arc<dyn JobStorage + Send + Sync>,
}

impl JobLedger {
    pub fn new(storage: Arc<dyn JobStorage + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Creates and persists a `pending` job
    ///
    /// # Errors
    ///
    /// Validation error if `end_date > start_date`, or the insert error.
    pub async fn create(
        &self,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<ExportJob> {
        let job = ExportJob::new(start_date, end_date)?;
        self.storage.insert_job(&job).await?;

        tracing::info!(
            job_id = %job.id,
            start_date = %start_date,
            end_date = ?end_date,
            "Export job created"
        );
        Ok(job)
    }

    /// Loads a job
    ///
    /// # Errors
    ///
    /// [`SyncError::JobNotFound`] when no row exists.
    pub async fn load(&self, job_id: JobId) -> Result<ExportJob> {
        self.storage
            .load_job(job_id)
            .await?
            .ok_or_else(|| SyncError::JobNotFound(job_id.to_string()))
    }

    /// Moves a job to `next`, recording `reason` as the pause reason or the
    /// failure message
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidTransition`] when the move is not in the table.
    pub async fn transition(
        &self,
        job_id: JobId,
        next: JobStatus,
        reason: Option<String>,
    ) -> Result<ExportJob> {
        let mut job = self.load(job_id).await?;

        if !job.status.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: job.status.to_string(),
                to: next.to_string(),
            });
        }

        let previous = job.status;
        job.apply_status(next, reason);
        self.storage.save_status(&job).await?;

        tracing::info!(
            job_id = %job_id,
            from = %previous,
            to = %next,
            reason = job.pause_reason.as_deref().or(job.last_error.as_deref()),
            "Job status changed"
        );
        Ok(job)
    }

    /// Persists cursor and counters; last write wins
    pub async fn update_progress(&self, job: &ExportJob) -> Result<()> {
        tracing::debug!(
            job_id = %job.id,
            processing_date = %job.processing_date,
            offset = job.processing_offset,
            total = job.total_leads,
            exported = job.exported_leads,
            errors = job.error_leads,
            "Checkpointing job progress"
        );
        self.storage.save_progress(job).await
    }

    /// Most recent jobs first
    pub async fn list(&self, limit: usize) -> Result<Vec<ExportJob>> {
        self.storage.list_jobs(limit).await
    }
}
