// Export job ledger

pub mod job;
pub mod manager;

pub use job::{CursorMove, ExportJob, JobStatus};
pub use manager::JobLedger;
