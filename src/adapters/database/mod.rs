//! Storage abstraction layer
//!
//! Trait seams between the core and the stores, and the factory that wires
//! the PostgreSQL implementations from configuration.

pub mod factory;
pub mod traits;

pub use factory::{create_stores, Stores};
pub use traits::{CrmStore, EventLog, JobStorage, LeadSink, LeadSource};
