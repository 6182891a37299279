//! Export run summary
//!
//! Counts here cover one driver run. The job row holds the cumulative totals
//! across resumes.

use crate::core::state::job::{ExportJob, JobStatus};
use crate::domain::ids::JobId;
use crate::domain::RecordErrorDetail;
use chrono::NaiveDate;
use std::time::Duration;

/// Summary of one driver run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub job_id: JobId,

    /// Status of the job when the run stopped
    pub final_status: JobStatus,

    /// Cursor position when the run stopped
    pub processing_date: NaiveDate,

    /// Batches read during this run
    pub batches: usize,

    /// Rows read during this run
    pub total_leads: usize,

    /// Rows exported during this run
    pub exported_leads: usize,

    /// Rows that failed during this run
    pub error_leads: usize,

    pub duration: Duration,

    /// Per-record failures
    pub errors: Vec<RecordErrorDetail>,

    /// Why the job failed or paused, when it did
    pub reason: Option<String>,
}

impl ExportSummary {
    /// Creates an empty summary for `job`
    pub fn new(job: &ExportJob) -> Self {
        Self {
            job_id: job.id,
            final_status: job.status,
            processing_date: job.processing_date,
            batches: 0,
            total_leads: 0,
            exported_leads: 0,
            error_leads: 0,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
            reason: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Folds one batch into the run totals
    pub fn add_batch(&mut self, rows: usize, exported: usize, errors: Vec<RecordErrorDetail>) {
        self.batches += 1;
        self.total_leads += rows;
        self.exported_leads += exported;
        self.error_leads += errors.len();
        self.errors.extend(errors);
    }

    /// Records where the job stood when the run ended
    pub fn finish(&mut self, job: &ExportJob) {
        self.final_status = job.status;
        self.processing_date = job.processing_date;
        self.reason = match job.status {
            JobStatus::Paused => job.pause_reason.clone(),
            JobStatus::Failed => job.last_error.clone(),
            _ => None,
        };
    }

    /// Completed with no record errors
    pub fn is_successful(&self) -> bool {
        self.final_status == JobStatus::Completed && self.error_leads == 0
    }

    /// Share of rows exported, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_leads == 0 {
            return 100.0;
        }
        (self.exported_leads as f64 / self.total_leads as f64) * 100.0
    }

    pub fn log_summary(&self) {
        tracing::info!(
            job_id = %self.job_id,
            status = %self.final_status,
            processing_date = %self.processing_date,
            batches = self.batches,
            total = self.total_leads,
            exported = self.exported_leads,
            errors = self.error_leads,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Export run finished"
        );

        if let Some(reason) = &self.reason {
            tracing::warn!(job_id = %self.job_id, reason = %reason, "Export stopped early");
        }
        for error in self.errors.iter().take(20) {
            tracing::warn!(
                record_id = error.record_id.as_deref().unwrap_or("<none>"),
                message = %error.message,
                "Record error"
            );
        }
    }
}
