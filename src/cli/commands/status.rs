//! Status command implementation
//!
//! Lists export jobs with their cursor and counts, newest first.

use super::{connect, load_valid_config, EXIT_FATAL};
use crate::core::state::job::ExportJob;
use crate::core::state::JobLedger;
use crate::domain::ids::JobId;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single job in detail
    #[arg(long)]
    pub job_id: Option<JobId>,

    /// Number of jobs to list
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };
        let ledger = JobLedger::new(stores.job_storage());

        if let Some(job_id) = self.job_id {
            return match ledger.load(job_id).await {
                Ok(job) => {
                    print_job(&job);
                    Ok(0)
                }
                Err(e) if e.is_not_found() => {
                    println!("No job with id {job_id}");
                    Ok(1)
                }
                Err(e) => {
                    eprintln!("Failed to load job: {e}");
                    Ok(EXIT_FATAL)
                }
            };
        }

        let jobs = match ledger.list(self.limit).await {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Failed to list jobs: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if jobs.is_empty() {
            println!("No export jobs found.");
            println!("Run 'leadsync export --start-date YYYY-MM-DD' to start exporting leads.");
            return Ok(0);
        }

        println!("Found {} job(s):", jobs.len());
        println!();
        println!(
            "{:<38} {:<10} {:<12} {:<12} {:>8} {:>8} {:>8}",
            "Job ID", "Status", "Start", "Cursor", "Total", "Exported", "Errors"
        );
        println!("{}", "-".repeat(102));
        for job in &jobs {
            println!(
                "{:<38} {:<10} {:<12} {:<12} {:>8} {:>8} {:>8}",
                job.id.to_string(),
                job.status.as_str(),
                job.start_date.to_string(),
                job.processing_date.to_string(),
                job.total_leads,
                job.exported_leads,
                job.error_leads
            );
        }
        println!();
        Ok(0)
    }
}

fn print_job(job: &ExportJob) {
    println!("Job {}", job.id);
    println!("  Status: {}", job.status);
    println!(
        "  Range: {} back to {}",
        job.start_date,
        job.end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "floor date".to_string())
    );
    println!("  Cursor: {} (offset {})", job.processing_date, job.processing_offset);
    if let Some(day) = job.last_completed_date {
        println!("  Last completed day: {day}");
    }
    println!(
        "  Leads: {} read, {} exported, {} errors",
        job.total_leads, job.exported_leads, job.error_leads
    );
    if let Some(reason) = &job.pause_reason {
        println!("  Pause reason: {reason}");
    }
    if let Some(error) = &job.last_error {
        println!("  Last error: {error}");
    }
    println!("  Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(completed) = job.completed_at {
        println!("  Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
}
