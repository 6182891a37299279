//! PostgreSQL connection pool
//!
//! One [`PostgreSQLClient`] per store. The statement timeout is applied to
//! every pooled connection through the startup options.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{Result, StoreError, SyncError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

const MIGRATION_SQL: &str = include_str!("../../../migrations/001_initial_schema.sql");

/// Pooled PostgreSQL client
pub struct PostgreSQLClient {
    pool: Pool,
    safe_connection_string: String,
}

impl PostgreSQLClient {
    /// Builds the pool. No connection is opened until first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable connection string or
    /// TLS setup failure.
    pub fn new(config: &PostgreSQLConfig) -> Result<Self> {
        let conn_str: &str = config.connection_string.expose_secret().as_ref();
        let mut pg_config: tokio_postgres::Config = conn_str.parse().map_err(|e| {
            SyncError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
        })?;

        pg_config.options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_seconds * 1000
        ));
        pg_config.connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if mode == "require" {
                    SslMode::Require
                } else {
                    SslMode::Prefer
                });
                let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                    SyncError::Configuration(format!("Failed to initialize TLS: {e}"))
                })?;
                let tls = postgres_native_tls::MakeTlsConnector::new(connector);
                Manager::from_config(pg_config, tls, manager_config)
            }
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            safe_connection_string: redact_connection_string(conn_str),
        })
    }

    /// Runs `SELECT 1`
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("Connection test failed: {e}")))?;

        tracing::info!(target_db = %self.safe_connection_string, "PostgreSQL connection test successful");
        Ok(())
    }

    /// Applies the embedded schema; every statement is idempotent
    pub async fn run_migrations(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .batch_execute(MIGRATION_SQL)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        tracing::info!(target_db = %self.safe_connection_string, "PostgreSQL schema initialized");
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to get connection from pool: {e}")).into()
        })
    }

    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()).into())
    }

    pub async fn query_opt(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.get_connection().await?;
        client
            .query_opt(query, params)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()).into())
    }

    /// Executes a statement and returns the affected row count
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        self.execute_as(statement, params, StoreError::QueryFailed).await
    }

    /// Like [`execute`](Self::execute), labelling failures with `kind`
    pub async fn execute_as(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
        kind: fn(String) -> StoreError,
    ) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| kind(e.to_string()).into())
    }

    /// Connection string with credentials removed, for logs
    pub fn connection_string_safe(&self) -> &str {
        &self.safe_connection_string
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn redact_connection_string(conn_str: &str) -> String {
    conn_str
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
