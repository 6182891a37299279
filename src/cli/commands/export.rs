//! Export command implementation
//!
//! Creates an export job and drives it in the foreground, or continues an
//! existing job with `--job-id`.

use super::{build_driver, connect, load_valid_config, EXIT_FATAL};
use crate::core::control::{JobCommand, JobController};
use crate::core::export::{ExportDriver, ExportSummary, SHUTDOWN_REASON};
use crate::core::state::job::JobStatus;
use crate::core::state::JobLedger;
use crate::domain::ids::JobId;
use chrono::NaiveDate;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Most recent day to export (the cursor walks backward from here)
    #[arg(long, required_unless_present = "job_id", conflicts_with = "job_id")]
    pub start_date: Option<NaiveDate>,

    /// Oldest day to export, inclusive; defaults to `export.floor_date`
    #[arg(long, requires = "start_date")]
    pub end_date: Option<NaiveDate>,

    /// Continue an existing job instead of creating one
    #[arg(long)]
    pub job_id: Option<JobId>,

    /// Read and map leads without writing to the destination
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }

        if config.dry_run() {
            println!("DRY RUN MODE - no leads will be written to the destination");
            println!();
        }

        if !self.yes && !config.dry_run() && self.job_id.is_none() {
            println!("Export Configuration:");
            println!("  Start date: {}", self.start_date.map(|d| d.to_string()).unwrap_or_default());
            println!(
                "  End date: {}",
                self.end_date.unwrap_or(config.export.floor_date)
            );
            println!("  Batch size: {}", config.export.batch_size);
            println!("  Batch delay: {}ms", config.export.batch_delay_ms);
            println!();
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };
        let ledger = JobLedger::new(stores.job_storage());
        let controller = JobController::new(ledger.clone());
        let driver = build_driver(&config, &stores, shutdown_signal);

        let job_id = match (self.job_id, self.start_date) {
            (Some(job_id), _) => {
                match ledger.load(job_id).await {
                    Ok(job) if job.status == JobStatus::Paused => {
                        if let Err(e) = controller.apply(JobCommand::Resume { job_id }).await {
                            eprintln!("Failed to resume job {job_id}: {e}");
                            return Ok(EXIT_FATAL);
                        }
                    }
                    Ok(job) if job.status.is_terminal() => {
                        println!("Job {job_id} is already {}.", job.status);
                        return Ok(0);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("Failed to load job {job_id}: {e}");
                        return Ok(EXIT_FATAL);
                    }
                }
                job_id
            }
            (None, Some(start_date)) => {
                let command = JobCommand::Create {
                    start_date,
                    end_date: self.end_date,
                };
                match controller.apply(command).await {
                    Ok(outcome) => {
                        println!("Created export job {}", outcome.job.id);
                        outcome.job.id
                    }
                    Err(e) => {
                        eprintln!("Failed to create export job: {e}");
                        return Ok(super::EXIT_CONFIG);
                    }
                }
            }
            // clap requires one of the two
            (None, None) => return Ok(super::EXIT_CONFIG),
        };

        drive(&driver, job_id).await
    }
}

/// Runs `job_id` to its next stop and reports it
pub(crate) async fn drive(driver: &ExportDriver, job_id: JobId) -> anyhow::Result<i32> {
    println!("Starting export...");
    println!();

    let summary = match driver.run(job_id).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Export failed");
            eprintln!("Export failed: {e}");
            return Ok(EXIT_FATAL);
        }
    };

    print_summary(&summary);

    let code = exit_code(&summary);
    match (code, summary.final_status) {
        (130, _) => {
            println!("Export interrupted gracefully. Progress saved.");
            println!("   Resume with: leadsync export --job-id {job_id}");
        }
        (1, _) => println!("Export completed with failures"),
        (0, JobStatus::Completed) => println!("Export completed successfully!"),
        (0, JobStatus::Paused) => println!("Export paused."),
        _ => println!("Export did not complete."),
    }
    Ok(code)
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("Export Summary:");
    println!("  Job: {}", summary.job_id);
    println!("  Status: {}", summary.final_status);
    println!("  Cursor: {}", summary.processing_date);
    println!("  Batches: {}", summary.batches);
    println!("  Leads read: {}", summary.total_leads);
    println!("  Exported: {}", summary.exported_leads);
    println!("  Errors: {}", summary.error_leads);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();

    if !summary.errors.is_empty() {
        println!("Errors encountered:");
        for error in summary.errors.iter().take(10) {
            println!(
                "  - {}: {}",
                error.record_id.as_deref().unwrap_or("<no id>"),
                error.message
            );
        }
        if summary.errors.len() > 10 {
            println!("  ... and {} more", summary.errors.len() - 10);
        }
        println!();
    }

    if let Some(reason) = &summary.reason {
        println!("Reason: {reason}");
    }
}

/// Exit code for a finished run
pub(crate) fn exit_code(summary: &ExportSummary) -> i32 {
    match summary.final_status {
        JobStatus::Paused if summary.reason.as_deref() == Some(SHUTDOWN_REASON) => 130,
        JobStatus::Failed => EXIT_FATAL,
        JobStatus::Completed if summary.error_leads > 0 => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::job::ExportJob;
    use crate::domain::RecordErrorDetail;

    fn summary(status: JobStatus, reason: Option<&str>) -> ExportSummary {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut summary = ExportSummary::new(&ExportJob::new(start, None).unwrap());
        summary.final_status = status;
        summary.reason = reason.map(str::to_string);
        summary
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&summary(JobStatus::Completed, None)), 0);
        assert_eq!(exit_code(&summary(JobStatus::Paused, Some(SHUTDOWN_REASON))), 130);
        assert_eq!(exit_code(&summary(JobStatus::Paused, Some("operator"))), 0);
        assert_eq!(exit_code(&summary(JobStatus::Failed, Some("boom"))), EXIT_FATAL);
    }

    #[test]
    fn test_partial_success_exit_code() {
        let mut s = summary(JobStatus::Completed, None);
        s.add_batch(2, 1, vec![RecordErrorDetail::new("bad id")]);
        assert_eq!(exit_code(&s), 1);
    }
}
