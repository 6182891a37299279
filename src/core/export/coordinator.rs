//! Export driver
//!
//! Runs one job as a sequence of batches. Every iteration starts from the
//! job row in the ledger, so a pause written by anyone else is observed at
//! the next batch boundary. Nothing about the run lives only in memory.

use crate::adapters::database::traits::LeadSource;
use crate::config::schema::ExportConfig;
use crate::core::export::batch::BatchProcessor;
use crate::core::export::summary::ExportSummary;
use crate::core::state::job::{CursorMove, ExportJob, JobStatus};
use crate::core::state::JobLedger;
use crate::domain::ids::JobId;
use crate::domain::{RecordErrorDetail, Result, ResultExt, SyncError};
use crate::log_batch_progress;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Pause reason recorded when the process is asked to stop
pub const SHUTDOWN_REASON: &str = "shutdown signal received";

/// Driver tuning taken from `[export]`
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub floor_date: NaiveDate,
}

impl From<&ExportConfig> for DriverSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            floor_date: config.floor_date,
        }
    }
}

/// Counts of one processed batch
#[derive(Debug, Default)]
pub struct BatchStats {
    pub rows: usize,
    pub exported: usize,
    pub errors: Vec<RecordErrorDetail>,
}

/// What a single batch step left behind
#[derive(Debug)]
pub enum StepOutcome {
    /// A batch was processed and the job is still running
    Continue(BatchStats),
    /// The last batch in range was processed; `job` is the row afterwards
    Finished { batch: BatchStats, job: ExportJob },
    /// Nothing was processed; the job is not (or no longer) running
    Stopped(ExportJob),
}

/// Drives export jobs through the ledger
pub struct ExportDriver {
    ledger: JobLedger,
    source: Arc<dyn LeadSource + Send + Sync>,
    batch: BatchProcessor,
    settings: DriverSettings,
    shutdown: watch::Receiver<bool>,
}

impl ExportDriver {
    pub fn new(
        ledger: JobLedger,
        source: Arc<dyn LeadSource + Send + Sync>,
        batch: BatchProcessor,
        settings: DriverSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ledger,
            source,
            batch,
            settings,
            shutdown,
        }
    }

    /// Runs the job until it completes, fails or is paused
    ///
    /// A `pending` job is moved to `running` first. A job in any other
    /// non-running state is left alone and reported as is.
    ///
    /// # Errors
    ///
    /// Ledger read/write errors. Source read failures are not returned: they
    /// fail the job and show up in the summary.
    pub async fn run(&self, job_id: JobId) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut job = self.ledger.load(job_id).await?;

        if job.status == JobStatus::Pending {
            job = self.ledger.transition(job_id, JobStatus::Running, None).await?;
        }

        tracing::info!(
            job_id = %job_id,
            status = %job.status,
            processing_date = %job.processing_date,
            offset = job.processing_offset,
            stop_date = %job.stop_date(self.settings.floor_date),
            "Starting export run"
        );

        let mut summary = ExportSummary::new(&job);
        let mut shutdown = self.shutdown.clone();

        let final_job = loop {
            match self.step(job_id).await? {
                StepOutcome::Continue(batch) => {
                    summary.add_batch(batch.rows, batch.exported, batch.errors);
                    self.throttle(&mut shutdown).await;
                }
                StepOutcome::Finished { batch, job } => {
                    summary.add_batch(batch.rows, batch.exported, batch.errors);
                    break job;
                }
                StepOutcome::Stopped(job) => break job,
            }
        };

        summary.finish(&final_job);
        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Executes one batch of the driver loop
    pub async fn step(&self, job_id: JobId) -> Result<StepOutcome> {
        let mut job = self.ledger.load(job_id).await?;
        if job.status != JobStatus::Running {
            tracing::info!(job_id = %job_id, status = %job.status, "Job is not running, stopping");
            return Ok(StepOutcome::Stopped(job));
        }

        if *self.shutdown.borrow() {
            tracing::warn!(job_id = %job_id, "Shutdown requested, pausing job");
            let job = self
                .ledger
                .transition(job_id, JobStatus::Paused, Some(SHUTDOWN_REASON.to_string()))
                .await?;
            return Ok(StepOutcome::Stopped(job));
        }

        let (from, to) = day_window(job.processing_date)?;
        let rows = match self
            .source
            .fetch_modified_between(
                from,
                to,
                job.processing_offset,
                self.settings.batch_size as i64,
            )
            .await
            .with_context(|| format!("reading leads modified on {}", job.processing_date))
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    processing_date = %job.processing_date,
                    error = %e,
                    "Failed to read source leads, failing job"
                );
                let job = self.settle(job_id, JobStatus::Failed, Some(e.to_string())).await?;
                return Ok(StepOutcome::Stopped(job));
            }
        };

        let result = self.batch.process_batch(job_id, &rows).await;
        let batch_date = job.processing_date;
        job.record_batch(rows.len(), result.exported, result.errors);
        let cursor = job.advance_cursor(rows.len(), self.settings.batch_size, self.settings.floor_date);
        self.ledger.update_progress(&job).await?;

        log_batch_progress!(job_id, batch_date, rows.len(), result.exported, result.errors);

        let batch = BatchStats {
            rows: rows.len(),
            exported: result.exported,
            errors: result.error_details,
        };

        if cursor == CursorMove::Finished {
            let job = self.settle(job_id, JobStatus::Completed, None).await?;
            return Ok(StepOutcome::Finished { batch, job });
        }
        Ok(StepOutcome::Continue(batch))
    }

    /// Moves the job to a terminal state unless someone paused it meanwhile
    async fn settle(
        &self,
        job_id: JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<ExportJob> {
        match self.ledger.transition(job_id, status, reason).await {
            Ok(job) => Ok(job),
            // Paused while the batch was in flight; the pause stands
            Err(SyncError::InvalidTransition { .. }) => self.ledger.load(job_id).await,
            Err(e) => Err(e),
        }
    }

    /// Sleeps between batches, waking early on shutdown
    async fn throttle(&self, shutdown: &mut watch::Receiver<bool>) {
        let delay = self.settings.batch_delay;
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// `[day 00:00, next day 00:00)` in UTC
///
/// Half-open so a timestamp anywhere in the last millisecond of the day,
/// down to the microsecond, still belongs to it.
pub fn day_window(day: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let from = day.and_hms_opt(0, 0, 0);
    let to = day.succ_opt().and_then(|next| next.and_hms_opt(0, 0, 0));
    match (from, to) {
        (Some(from), Some(to)) => Ok((Utc.from_utc_datetime(&from), Utc.from_utc_datetime(&to))),
        _ => Err(SyncError::Export(format!("Cannot build a time window for {day}"))),
    }
}
