//! Configuration schema types
//!
//! Maps the TOML file onto typed sections. Each section validates itself and
//! [`LeadsyncConfig::validate`] runs them all.

use crate::config::SecretString;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadsyncConfig {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub environment: Environment,

    /// Primary store: export source, job ledger, audit events and the
    /// webhook-maintained CRM tables
    pub source: SourceConfig,

    /// Secondary store receiving exported leads
    pub destination: DestinationConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// Bitrix24 REST access; required only for webhook handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrix: Option<BitrixConfig>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LeadsyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns the first section error found
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.database.validate("source")?;
        validate_identifier("source.leads_table", &self.source.leads_table)?;
        validate_identifier("source.modified_column", &self.source.modified_column)?;
        self.destination.database.validate("destination")?;
        validate_identifier("destination.leads_table", &self.destination.leads_table)?;
        self.export.validate()?;
        if let Some(bitrix) = &self.bitrix {
            bitrix.validate(&self.environment)?;
        }
        self.server.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Whether writes to the destination are suppressed
    pub fn dry_run(&self) -> bool {
        self.application.dry_run || self.export.dry_run
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (don't write to the destination store)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// PostgreSQL connection settings shared by both stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgreSQLConfig {
    /// `postgres://` or `postgresql://` URL
    pub connection_string: SecretString,

    #[serde(default = "default_pg_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_pg_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,

    /// Per-statement timeout applied to every pooled connection
    #[serde(default = "default_pg_statement_timeout_seconds")]
    pub statement_timeout_seconds: u64,

    #[serde(default = "default_pg_ssl_mode")]
    pub ssl_mode: String,
}

impl PostgreSQLConfig {
    fn validate(&self, section: &str) -> Result<(), String> {
        use secrecy::ExposeSecret;

        let conn_str: &str = self.connection_string.expose_secret().as_ref();

        if conn_str.is_empty() {
            return Err(format!("{section}.connection_string cannot be empty"));
        }

        if !conn_str.starts_with("postgresql://") && !conn_str.starts_with("postgres://") {
            return Err(format!(
                "{section}.connection_string must start with postgresql:// or postgres://"
            ));
        }

        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(format!(
                "{section}.max_connections must be between 1 and 100, got {}",
                self.max_connections
            ));
        }

        if self.statement_timeout_seconds == 0 {
            return Err(format!("{section}.statement_timeout_seconds must be > 0"));
        }

        let valid_ssl_modes = ["disable", "prefer", "require"];
        if !valid_ssl_modes.contains(&self.ssl_mode.as_str()) {
            return Err(format!(
                "{section}.ssl_mode must be one of: {}, got '{}'",
                valid_ssl_modes.join(", "),
                self.ssl_mode
            ));
        }

        Ok(())
    }
}

/// Primary store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub database: PostgreSQLConfig,

    /// Table holding the leads to export
    #[serde(default = "default_leads_table")]
    pub leads_table: String,

    /// Timestamp column the day window is applied to
    #[serde(default = "default_modified_column")]
    pub modified_column: String,
}

/// Destination store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(flatten)]
    pub database: PostgreSQLConfig,

    #[serde(default = "default_leads_table")]
    pub leads_table: String,
}

/// Export job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Rows read per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Lower bound of the cursor for jobs created without an end date
    #[serde(default = "default_floor_date")]
    pub floor_date: NaiveDate,

    #[serde(default)]
    pub dry_run: bool,

    /// How long `serve` waits for running jobs to pause on shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            floor_date: default_floor_date(),
            dry_run: false,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=1000).contains(&self.batch_size) {
            return Err(format!(
                "export.batch_size must be between 1 and 1000, got {}",
                self.batch_size
            ));
        }

        if self.batch_delay_ms > 60_000 {
            return Err(format!(
                "export.batch_delay_ms must be <= 60000, got {}",
                self.batch_delay_ms
            ));
        }

        Ok(())
    }
}

/// Retry configuration for the Bitrix24 REST client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Bitrix24 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitrixConfig {
    /// Inbound webhook URL, e.g. `https://acme.bitrix24.com.br/rest/1/<token>/`.
    /// The token in the path is the credential.
    pub webhook_url: SecretString,

    /// Expected `auth[application_token]` of incoming events; unchecked when absent
    #[serde(default)]
    pub application_token: Option<SecretString>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification. Cannot be disabled in production.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Extra Bitrix lead field → source column translations, e.g.
    /// `UF_CRM_1690000000 = "scouter"`
    #[serde(default)]
    pub lead_fields: HashMap<String, String>,
}

impl BitrixConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        let url: &str = self.webhook_url.expose_secret().as_ref();
        if url.is_empty() {
            return Err("bitrix.webhook_url cannot be empty".to_string());
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("bitrix.webhook_url must start with http:// or https://".to_string());
        }

        if let Some(token) = &self.application_token {
            if token.expose_secret().is_empty() {
                return Err("bitrix.application_token cannot be blank when set".to_string());
            }
        }

        if self.timeout_seconds == 0 {
            return Err("bitrix.timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments"
                    .to_string(),
            );
        }

        if self.retry.max_retries > 10 {
            return Err(format!(
                "bitrix.retry.max_retries must be <= 10, got {}",
                self.retry.max_retries
            ));
        }

        Ok(())
    }
}

/// HTTP listener for webhooks and job control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("server.host cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("server.port must be > 0".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// `daily`, `hourly` or `never`
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Rotated files kept on disk; older ones are deleted
    #[serde(default = "default_local_max_files")]
    pub local_max_files: usize,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_files == 0 {
            return Err("logging.local_max_files must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_files: default_local_max_files(),
        }
    }
}

/// Checks that a configured table or column name is a plain SQL identifier,
/// optionally schema-qualified
pub fn validate_identifier(field: &str, value: &str) -> Result<(), String> {
    let valid = !value.is_empty()
        && value.split('.').count() <= 2
        && value.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(format!("{field} is not a valid SQL identifier: '{value}'"))
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_retries() -> usize {
    3
}

fn default_batch_size() -> usize {
    100
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_floor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_leads_table() -> String {
    "leads".to_string()
}

fn default_modified_column() -> String {
    "updated_at".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_local_path() -> String {
    "/var/log/leadsync".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_files() -> usize {
    14
}

fn default_pg_max_connections() -> usize {
    10
}

fn default_pg_connection_timeout_seconds() -> u64 {
    30
}

fn default_pg_statement_timeout_seconds() -> u64 {
    60
}

fn default_pg_ssl_mode() -> String {
    "prefer".to_string()
}
