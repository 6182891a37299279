//! PostgreSQL integration
//!
//! Both the primary and the destination store are PostgreSQL databases with
//! the schema in `migrations/`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
