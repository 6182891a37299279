//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the
//! field names of recurring log lines consistent across the driver, the
//! webhook handlers and the REST client.
//!
//! ```no_run
//! use leadsync::logging::init_logging;
//! use leadsync::config::LoggingConfig;
//!
//! let _guard = init_logging("info", &LoggingConfig::default()).expect("logging");
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log one finished export batch
///
/// ```no_run
/// use leadsync::log_batch_progress;
///
/// let job_id = "1b4e28ba-2fa1-41d2-883f-0016d3cca427";
/// log_batch_progress!(job_id, "2024-01-10", 100, 98, 2);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($job_id:expr, $processing_date:expr, $rows:expr, $exported:expr, $errors:expr) => {
        tracing::info!(
            job_id = %$job_id,
            processing_date = %$processing_date,
            rows = $rows,
            exported = $exported,
            errors = $errors,
            "Batch processed"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use leadsync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
