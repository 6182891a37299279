//! Domain models and types for leadsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`LeadId`], [`DealId`])
//! - **Records** ([`RawLead`], [`Lead`], [`Deal`], [`Negotiation`], [`SyncEvent`])
//! - **Error types** ([`SyncError`], [`CrmError`], [`StoreError`], [`MappingError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`]:
//!
//! ```rust
//! use leadsync::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = leadsync::config::load_config("leadsync.toml")?;
//!     let _ = config.export.batch_size;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod crm;
pub mod errors;
pub mod event;
pub mod ids;
pub mod lead;
pub mod result;

// Re-export commonly used types for convenience
pub use context::ResultExt;
pub use crm::{Deal, Negotiation, NegotiationStatus};
pub use errors::{CrmError, MappingError, RecordErrorDetail, StoreError, SyncError};
pub use event::{EventDirection, EventStatus, SyncEvent};
pub use ids::{DealId, JobId, LeadId};
pub use lead::{Lead, RawLead};
pub use result::Result;
