//! Configuration management for leadsync.
//!
//! TOML configuration with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `LEADSYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use leadsync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("leadsync.toml")?;
//! println!("Batch size: {}", config.export.batch_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [source]
//! connection_string = "${LEADSYNC_PRIMARY_DATABASE_URL}"
//! leads_table = "leads"
//! modified_column = "updated_at"
//!
//! [destination]
//! connection_string = "${LEADSYNC_REPLICA_DATABASE_URL}"
//! ssl_mode = "require"
//!
//! [export]
//! batch_size = 100
//! batch_delay_ms = 500
//! floor_date = "2020-01-01"
//!
//! [bitrix]
//! webhook_url = "${LEADSYNC_BITRIX_WEBHOOK_URL}"
//! application_token = "${LEADSYNC_BITRIX_APP_TOKEN}"
//!
//! [server]
//! port = 8080
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BitrixConfig, DestinationConfig, Environment, ExportConfig,
    LeadsyncConfig, LoggingConfig, PostgreSQLConfig, RetryConfig, ServerConfig, SourceConfig,
};
pub use secret::{redact_url, secret_string, secret_string_opt, SecretString, SecretValue};
