//! Core business logic for leadsync.
//!
//! - [`state`] - Export job ledger and the job state machine
//! - [`transform`] - Lead field mapping and type coercion
//! - [`export`] - Date-cursor driver loop and batch processing
//! - [`control`] - `create` / `pause` / `resume` job commands
//! - [`webhook`] - Bitrix24 webhook parsing, enrichment and persistence
//!
//! # Export Workflow
//!
//! 1. **Create**: a job row is written in `pending` with the cursor at `start_date`
//! 2. **Run**: the driver moves it to `running` and loops over batches
//! 3. **Batch**: read one page of leads modified on the cursor day, map, upsert, audit
//! 4. **Advance**: a short page moves the cursor back one day
//! 5. **Checkpoint**: progress is written after every batch
//! 6. **Finish**: the job completes past its end date, fails on a read error, or pauses
//!
//! # Example
//!
//! ```rust,no_run
//! use leadsync::adapters::database::create_stores;
//! use leadsync::config::load_config;
//! use leadsync::core::export::{BatchProcessor, DriverSettings, ExportDriver};
//! use leadsync::core::state::JobLedger;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("leadsync.toml")?;
//! let stores = create_stores(&config)?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let ledger = JobLedger::new(stores.job_storage());
//! let driver = ExportDriver::new(
//!     ledger.clone(),
//!     stores.lead_source(),
//!     BatchProcessor::new(stores.lead_sink(), stores.event_log(), config.dry_run()),
//!     DriverSettings::from(&config.export),
//!     shutdown_rx,
//! );
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! let job = ledger.create(start, None).await?;
//! let summary = driver.run(job.id).await?;
//! println!("Exported: {}", summary.exported_leads);
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod export;
pub mod state;
pub mod transform;
pub mod webhook;
