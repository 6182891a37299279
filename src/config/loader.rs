//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::LeadsyncConfig;
use super::secret::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`LeadsyncConfig`]
/// 4. Applies environment variable overrides (`LEADSYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`SyncError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use leadsync::config::loader::load_config;
///
/// let config = load_config("leadsync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<LeadsyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn parse_config(contents: &str) -> Result<LeadsyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: LeadsyncConfig = toml::from_str(&contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(name: &str) -> Option<String> {
    std::env::var(format!("LEADSYNC_{name}")).ok()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env(name).and_then(|v| v.trim().parse().ok())
}

/// Applies `LEADSYNC_<SECTION>_<KEY>` overrides
///
/// Unparseable numeric or boolean values are ignored and the file value kept.
fn apply_env_overrides(config: &mut LeadsyncConfig) {
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_parsed("APPLICATION_DRY_RUN") {
        config.application.dry_run = val;
    }

    if let Some(val) = env("SOURCE_CONNECTION_STRING") {
        config.source.database.connection_string = secret_string(val);
    }
    if let Some(val) = env_parsed("SOURCE_MAX_CONNECTIONS") {
        config.source.database.max_connections = val;
    }
    if let Some(val) = env("SOURCE_SSL_MODE") {
        config.source.database.ssl_mode = val;
    }
    if let Some(val) = env("SOURCE_LEADS_TABLE") {
        config.source.leads_table = val;
    }

    if let Some(val) = env("DESTINATION_CONNECTION_STRING") {
        config.destination.database.connection_string = secret_string(val);
    }
    if let Some(val) = env_parsed("DESTINATION_MAX_CONNECTIONS") {
        config.destination.database.max_connections = val;
    }
    if let Some(val) = env("DESTINATION_SSL_MODE") {
        config.destination.database.ssl_mode = val;
    }
    if let Some(val) = env("DESTINATION_LEADS_TABLE") {
        config.destination.leads_table = val;
    }

    if let Some(val) = env_parsed("EXPORT_BATCH_SIZE") {
        config.export.batch_size = val;
    }
    if let Some(val) = env_parsed("EXPORT_BATCH_DELAY_MS") {
        config.export.batch_delay_ms = val;
    }
    if let Some(val) = env_parsed("EXPORT_FLOOR_DATE") {
        config.export.floor_date = val;
    }
    if let Some(val) = env_parsed("EXPORT_DRY_RUN") {
        config.export.dry_run = val;
    }

    if let Some(bitrix) = config.bitrix.as_mut() {
        if let Some(val) = env("BITRIX_WEBHOOK_URL") {
            bitrix.webhook_url = secret_string(val);
        }
        if let Some(val) = env("BITRIX_APPLICATION_TOKEN") {
            bitrix.application_token = Some(secret_string(val));
        }
        if let Some(val) = env_parsed("BITRIX_TIMEOUT_SECONDS") {
            bitrix.timeout_seconds = val;
        }
        if let Some(val) = env_parsed("BITRIX_TLS_VERIFY") {
            bitrix.tls_verify = val;
        }
    }

    if let Some(val) = env("SERVER_HOST") {
        config.server.host = val;
    }
    if let Some(val) = env_parsed("SERVER_PORT") {
        config.server.port = val;
    }

    if let Some(val) = env_parsed("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
