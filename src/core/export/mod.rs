//! Export orchestration
//!
//! [`ExportDriver`] walks a job's date cursor backward one day at a time,
//! handing each page of source rows to [`BatchProcessor`].

pub mod batch;
pub mod coordinator;
pub mod summary;

pub use batch::{BatchProcessor, BatchResult};
pub use coordinator::{BatchStats, DriverSettings, ExportDriver, StepOutcome, SHUTDOWN_REASON};
pub use summary::ExportSummary;
