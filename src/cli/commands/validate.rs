//! Validate config command implementation

use crate::config::{load_config, redact_url};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("Configuration validation failed");
            println!("   Error: {e}");
            println!();
            return Ok(2);
        }

        let host = |conn: &str| conn.rsplit('@').next().unwrap_or("***").to_string();

        println!("Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Source: {} (table {}, column {})",
            host(config.source.database.connection_string.expose_secret().as_ref()),
            config.source.leads_table,
            config.source.modified_column
        );
        println!(
            "  Destination: {} (table {})",
            host(config.destination.database.connection_string.expose_secret().as_ref()),
            config.destination.leads_table
        );
        println!(
            "  Export: batch size {}, delay {}ms, floor date {}",
            config.export.batch_size, config.export.batch_delay_ms, config.export.floor_date
        );
        println!("  Dry Run: {}", config.dry_run());
        match &config.bitrix {
            Some(bitrix) => {
                println!("  Bitrix24: {}", redact_url(bitrix.webhook_url.expose_secret().as_ref()));
                println!(
                    "  Application token: {}",
                    if bitrix.application_token.is_some() {
                        "checked"
                    } else {
                        "not checked"
                    }
                );
                println!("  Extra lead fields: {}", bitrix.lead_fields.len());
            }
            None => println!("  Bitrix24: not configured (webhooks disabled)"),
        }
        println!("  Server: {}", config.server.bind_address());
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/leadsync.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_batch_size() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[source]
connection_string = "postgresql://u:p@localhost/src"

[destination]
connection_string = "postgresql://u:p@localhost/dst"

[export]
batch_size = 0
"#
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
