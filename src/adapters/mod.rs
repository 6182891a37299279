//! External system integrations for leadsync.
//!
//! - [`bitrix`] - Bitrix24 REST client used to enrich webhook notifications
//! - [`database`] - Storage traits and the store factory
//! - [`postgresql`] - PostgreSQL implementation of the storage traits
//! - `memory` - In-process implementation of the storage traits, behind the
//!   `test-util` feature
//!
//! Adapters isolate external dependencies so the core can be driven by test
//! doubles. The core only sees the traits in [`database::traits`] and
//! [`bitrix::CrmApi`].

pub mod bitrix;
pub mod database;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgresql;
