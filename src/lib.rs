// Leadsync - Lead export and Bitrix24 sync
// Copyright (c) 2025 Leadsync Contributors
// Licensed under the MIT License

//! # Leadsync - lead export and CRM sync
//!
//! Leadsync moves lead records out of a primary PostgreSQL store into a
//! destination store, one day at a time, and keeps deal and lead tables in
//! step with a Bitrix24 portal through its outbound webhooks.
//!
//! ## Overview
//!
//! - **Exporting** leads in date-cursor batches driven by a persisted job
//! - **Mapping** loosely typed source rows onto a canonical [`domain::Lead`]
//! - **Controlling** jobs (create, pause, resume) over HTTP or the CLI
//! - **Receiving** Bitrix24 deal and lead events, enriching them through the
//!   REST API and upserting or deleting local rows
//! - **Auditing** every exported record and webhook event as a sync event
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`server`] - HTTP routes for webhooks and job control
//! - [`core`] - Export driver, job ledger, field mapping, webhook pipeline
//! - [`adapters`] - PostgreSQL stores, Bitrix24 REST client, and an in-memory
//!   store under the `test-util` feature
//! - [`domain`] - Leads, jobs, deals, sync events and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leadsync::adapters::database::create_stores;
//! use leadsync::config::load_config;
//! use leadsync::core::export::{BatchProcessor, DriverSettings, ExportDriver};
//! use leadsync::core::state::JobLedger;
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("leadsync.toml")?;
//!     let stores = create_stores(&config)?;
//!
//!     let ledger = JobLedger::new(stores.job_storage());
//!     let job = ledger
//!         .create(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), None)
//!         .await?;
//!
//!     let (_tx, shutdown) = tokio::sync::watch::channel(false);
//!     let driver = ExportDriver::new(
//!         ledger,
//!         stores.lead_source(),
//!         BatchProcessor::new(stores.lead_sink(), stores.event_log(), false),
//!         DriverSettings::from(&config.export),
//!         shutdown,
//!     );
//!
//!     let summary = driver.run(job.id).await?;
//!     println!("Exported {} leads", summary.exported_leads);
//!     Ok(())
//! }
//! ```
//!
//! ## Export jobs
//!
//! A job walks backward from `start_date` to `end_date` (inclusive). Its
//! cursor, offset and counters live in the `export_jobs` table and are
//! written after every batch, so a paused or interrupted job continues from
//! the row where it stopped.
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`], backed by [`domain::SyncError`].
//! Per-record failures never fail a batch; they are counted on the job and
//! recorded as sync events.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod server;
