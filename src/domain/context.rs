//! Error context
//!
//! [`ResultExt`] prefixes an error with what was being attempted while
//! keeping the crate's [`SyncError`] type, e.g. the reason stored on a
//! failed job:
//!
//! ```text
//! reading leads modified on 2024-01-10: Store error: Query failed: relation "leads" does not exist
//! ```
//!
//! The wrapped error becomes [`SyncError::Other`], so classification
//! (`is_not_found`, retryability) must happen before context is added.

use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use std::fmt::Display;

/// Adds a context prefix to the error side of a `Result`
///
/// ```rust
/// use leadsync::domain::context::ResultExt;
/// use leadsync::domain::{Result, StoreError};
///
/// fn read_page() -> Result<Vec<u8>> {
///     Err(StoreError::QueryFailed("timeout".to_string()).into())
/// }
///
/// let err = read_page().context("reading page 3").unwrap_err();
/// assert_eq!(err.to_string(), "reading page 3: Store error: Query failed: timeout");
/// ```
pub trait ResultExt<T> {
    fn context<C: Display>(self, context: C) -> Result<T>;

    /// Like [`ResultExt::context`], building the prefix only on error
    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SyncError>,
{
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| SyncError::Other(format!("{context}: {}", e.into())))
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| SyncError::Other(format!("{}: {}", f(), e.into())))
    }
}
