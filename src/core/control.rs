//! Job control
//!
//! One entry point keyed by `action`: `create`, `pause`, `resume`. Commands
//! only touch the ledger; starting the driver is reported back as
//! [`ControlOutcome::launch`] and carried out by [`JobController::execute`].

use crate::core::export::ExportDriver;
use crate::core::state::job::{ExportJob, JobStatus};
use crate::core::state::JobLedger;
use crate::domain::ids::JobId;
use crate::domain::{Result, SyncError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Pause reason used when the caller gives none
pub const DEFAULT_PAUSE_REASON: &str = "paused by operator";

/// A job control request
///
/// ```
/// use leadsync::core::control::JobCommand;
///
/// let cmd: JobCommand = serde_json::from_str(
///     r#"{"action": "create", "start_date": "2024-01-10", "end_date": "2024-01-08"}"#,
/// ).unwrap();
/// assert!(matches!(cmd, JobCommand::Create { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JobCommand {
    Create {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
    Pause {
        job_id: JobId,
        #[serde(default)]
        reason: Option<String>,
    },
    Resume {
        job_id: JobId,
    },
}

/// Result of applying a command to the ledger
#[derive(Debug, Clone)]
pub struct ControlOutcome {
    /// The job row after the command
    pub job: ExportJob,
    /// Whether the driver should now run this job
    pub launch: bool,
}

/// Applies job commands and launches driver runs in the background
pub struct JobController {
    ledger: JobLedger,
    driver: Option<Arc<ExportDriver>>,
    runs: Mutex<Vec<JoinHandle<()>>>,
}

impl JobController {
    /// Controller that only updates the ledger
    pub fn new(ledger: JobLedger) -> Self {
        Self {
            ledger,
            driver: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Controller that also starts driver runs
    pub fn with_driver(ledger: JobLedger, driver: Arc<ExportDriver>) -> Self {
        Self {
            driver: Some(driver),
            ..Self::new(ledger)
        }
    }

    /// Applies `command` to the ledger
    ///
    /// # Errors
    ///
    /// Validation errors from `create`, [`crate::domain::SyncError::JobNotFound`]
    /// and [`crate::domain::SyncError::InvalidTransition`] from `pause` and
    /// `resume`.
    pub async fn apply(&self, command: JobCommand) -> Result<ControlOutcome> {
        match command {
            JobCommand::Create {
                start_date,
                end_date,
            } => {
                let job = self.ledger.create(start_date, end_date).await?;
                Ok(ControlOutcome { job, launch: true })
            }
            JobCommand::Pause { job_id, reason } => {
                let reason = reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PAUSE_REASON.to_string());
                let job = self
                    .ledger
                    .transition(job_id, JobStatus::Paused, Some(reason))
                    .await?;
                Ok(ControlOutcome { job, launch: false })
            }
            JobCommand::Resume { job_id } => {
                // Only a paused job can be resumed; pending jobs start via create
                let current = self.ledger.load(job_id).await?;
                if current.status != JobStatus::Paused {
                    return Err(SyncError::InvalidTransition {
                        from: current.status.to_string(),
                        to: JobStatus::Running.to_string(),
                    });
                }
                let job = self
                    .ledger
                    .transition(job_id, JobStatus::Running, None)
                    .await?;
                Ok(ControlOutcome { job, launch: true })
            }
        }
    }

    /// Applies `command` and starts a background run when it asks for one
    pub async fn execute(&self, command: JobCommand) -> Result<ExportJob> {
        let outcome = self.apply(command).await?;
        if outcome.launch {
            self.launch(outcome.job.id).await;
        }
        Ok(outcome.job)
    }

    async fn launch(&self, job_id: JobId) {
        let Some(driver) = self.driver.clone() else {
            tracing::debug!(job_id = %job_id, "No driver attached, not launching run");
            return;
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = driver.run(job_id).await {
                tracing::error!(job_id = %job_id, error = %e, "Export run aborted");
            }
        });

        let mut runs = self.runs.lock().await;
        runs.retain(|h| !h.is_finished());
        runs.push(handle);
    }

    /// Waits up to `timeout` for background runs to stop
    ///
    /// Runs observe the shutdown signal at their next batch, so this is
    /// called after the signal is sent. Returns the number of runs still
    /// going when the timeout expired.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let handles: Vec<JoinHandle<()>> = self.runs.lock().await.drain(..).collect();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut unfinished = 0;

        for handle in handles {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                unfinished += 1;
            }
        }

        if unfinished > 0 {
            tracing::warn!(unfinished, "Export runs still active at shutdown deadline");
        }
        unfinished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn controller() -> JobController {
        JobController::new(JobLedger::new(Arc::new(InMemoryStore::new())))
    }

    #[test]
    fn test_command_deserialization() {
        let pause: JobCommand = serde_json::from_str(
            r#"{"action":"pause","job_id":"1b4e28ba-2fa1-41d2-883f-0016d3cca427"}"#,
        )
        .unwrap();
        assert!(matches!(pause, JobCommand::Pause { reason: None, .. }));

        let unknown = serde_json::from_str::<JobCommand>(r#"{"action":"cancel","job_id":"x"}"#);
        assert!(unknown.is_err());
    }

    #[tokio::test]
    async fn test_create_launches() {
        let outcome = controller()
            .apply(JobCommand::Create {
                start_date: date(2024, 1, 10),
                end_date: Some(date(2024, 1, 8)),
            })
            .await
            .unwrap();

        assert!(outcome.launch);
        assert_eq!(outcome.job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_pause_then_resume() {
        let controller = controller();
        let created = controller
            .apply(JobCommand::Create {
                start_date: date(2024, 1, 10),
                end_date: None,
            })
            .await
            .unwrap();
        let job_id = created.job.id;

        let paused = controller
            .apply(JobCommand::Pause {
                job_id,
                reason: None,
            })
            .await
            .unwrap();
        assert!(!paused.launch);
        assert_eq!(paused.job.pause_reason.as_deref(), Some(DEFAULT_PAUSE_REASON));

        let resumed = controller.apply(JobCommand::Resume { job_id }).await.unwrap();
        assert!(resumed.launch);
        assert_eq!(resumed.job.status, JobStatus::Running);
        assert!(resumed.job.pause_reason.is_none());
    }

    #[tokio::test]
    async fn test_resume_requires_paused() {
        let controller = controller();
        let created = controller
            .apply(JobCommand::Create {
                start_date: date(2024, 1, 10),
                end_date: None,
            })
            .await
            .unwrap();

        let err = controller
            .apply(JobCommand::Resume {
                job_id: created.job.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_pause_unknown_job() {
        let err = controller()
            .apply(JobCommand::Pause {
                job_id: JobId::generate(),
                reason: Some("x".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::JobNotFound(_)));
    }
}
