//! Job command implementation
//!
//! `job pause` writes the pause to the ledger; a run in any process stops at
//! its next batch boundary. `job resume` moves the job back to `running` and
//! drives it in the foreground.

use super::export::drive;
use super::{build_driver, connect, load_valid_config, EXIT_FATAL};
use crate::core::control::{JobCommand, JobController};
use crate::core::state::JobLedger;
use crate::domain::ids::JobId;
use crate::domain::SyncError;
use clap::{Args, Subcommand};
use tokio::sync::watch;

/// Arguments for the job command
#[derive(Args, Debug)]
pub struct JobArgs {
    #[command(subcommand)]
    pub action: JobAction,
}

#[derive(Subcommand, Debug)]
pub enum JobAction {
    /// Pause a pending or running job
    Pause {
        job_id: JobId,

        /// Recorded on the job row
        #[arg(long)]
        reason: Option<String>,
    },

    /// Resume a paused job and run it in the foreground
    Resume { job_id: JobId },
}

impl JobArgs {
    /// Execute the job command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };
        let controller = JobController::new(JobLedger::new(stores.job_storage()));

        match &self.action {
            JobAction::Pause { job_id, reason } => {
                let command = JobCommand::Pause {
                    job_id: *job_id,
                    reason: reason.clone(),
                };
                match controller.apply(command).await {
                    Ok(outcome) => {
                        println!(
                            "Job {} paused at {} (offset {})",
                            outcome.job.id,
                            outcome.job.processing_date,
                            outcome.job.processing_offset
                        );
                        Ok(0)
                    }
                    Err(e) => Ok(report(*job_id, "pause", e)),
                }
            }
            JobAction::Resume { job_id } => {
                if let Err(e) = controller.apply(JobCommand::Resume { job_id: *job_id }).await {
                    return Ok(report(*job_id, "resume", e));
                }
                let driver = build_driver(&config, &stores, shutdown_signal);
                drive(&driver, *job_id).await
            }
        }
    }
}

fn report(job_id: JobId, verb: &str, error: SyncError) -> i32 {
    tracing::error!(job_id = %job_id, error = %error, "Failed to {verb} job");
    eprintln!("Cannot {verb} job {job_id}: {error}");
    match error {
        SyncError::JobNotFound(_) | SyncError::InvalidTransition { .. } => 1,
        _ => EXIT_FATAL,
    }
}
