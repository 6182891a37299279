//! Domain error types
//!
//! This module defines the error hierarchy for leadsync. Errors are
//! domain-specific and don't expose third-party types: HTTP and database
//! client errors are converted to strings at the adapter boundary.

use thiserror::Error;

/// Main leadsync error type
///
/// This is the primary error type used throughout the library. It wraps the
/// adapter-specific error types and carries the job-level failure kinds.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bitrix24 CRM errors
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    /// Relational store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Field mapping errors
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Export job errors
    #[error("Export error: {0}")]
    Export(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A job was asked to move between two states the ledger does not allow
    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A referenced job does not exist in the ledger
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Inbound webhook payload errors
    #[error("Webhook error: {0}")]
    Webhook(String),

    /// The webhook's application token did not match the configured one
    #[error("Unauthorized webhook: {0}")]
    Unauthorized(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Whether this error means "the thing is not there"
    ///
    /// Not-found conditions are soft skips for webhook handling.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SyncError::Crm(CrmError::NotFound(_)) | SyncError::JobNotFound(_)
        )
    }
}

/// Bitrix24 REST API errors
///
/// These errors don't expose the HTTP client types.
#[derive(Debug, Error)]
pub enum CrmError {
    /// Failed to reach the CRM
    #[error("Failed to connect to CRM: {0}")]
    ConnectionFailed(String),

    /// Entity not found upstream
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The CRM answered with a body we could not interpret
    #[error("Invalid response from CRM: {0}")]
    InvalidResponse(String),

    /// The CRM answered with an `error` envelope
    #[error("CRM API error {code}: {description}")]
    Api { code: String, description: String },

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl CrmError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CrmError::ConnectionFailed(_) | CrmError::ServerError { .. } | CrmError::Timeout(_) => {
                true
            }
            CrmError::Api { code, .. } => code == "QUERY_LIMIT_EXCEEDED",
            _ => false,
        }
    }
}

/// Relational store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to obtain a connection
    #[error("Failed to connect to store: {0}")]
    ConnectionFailed(String),

    /// A read query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// An upsert failed
    #[error("Upsert failed: {0}")]
    UpsertFailed(String),

    /// A delete failed
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A configured table or column name is not a plain SQL identifier
    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    /// A row could not be converted to a domain value
    #[error("Failed to decode row: {0}")]
    DecodeFailed(String),
}

/// Field mapping errors
///
/// The mapper coerces every optional field to null instead of failing; the
/// primary id is the only field whose absence is an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// The record has no primary id
    #[error("Record has no id")]
    MissingId,

    /// The record's primary id is not a positive integer
    #[error("Record id is not a positive integer: {0}")]
    InvalidId(String),
}

/// Per-record failure detail for the export summary
#[derive(Debug, Clone)]
pub struct RecordErrorDetail {
    /// Record id, when known
    pub record_id: Option<String>,

    /// Error message
    pub message: String,
}

impl RecordErrorDetail {
    /// Creates a new record error detail
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            record_id: None,
            message: message.into(),
        }
    }

    /// Sets the record id
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_crm_error_conversion() {
        let crm_err = CrmError::ConnectionFailed("Network error".to_string());
        let err: SyncError = crm_err.into();
        assert!(matches!(err, SyncError::Crm(_)));
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::UpsertFailed("duplicate key".to_string());
        let err: SyncError = store_err.into();
        assert!(matches!(err, SyncError::Store(_)));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = SyncError::InvalidTransition {
            from: "completed".to_string(),
            to: "running".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid job transition from completed to running"
        );
    }

    #[test]
    fn test_not_found_detection() {
        assert!(SyncError::from(CrmError::NotFound("deal 7".to_string())).is_not_found());
        assert!(SyncError::JobNotFound("abc".to_string()).is_not_found());
        assert!(!SyncError::Export("boom".to_string()).is_not_found());
    }

    #[test]
    fn test_crm_error_retryable() {
        assert!(CrmError::Timeout("30s".to_string()).is_retryable());
        assert!(CrmError::ServerError {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!CrmError::NotFound("deal 1".to_string()).is_retryable());
        assert!(!CrmError::ClientError {
            status: 400,
            message: "bad".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_record_error_detail_builder() {
        let detail = RecordErrorDetail::new("upsert failed").with_record_id("42");
        assert_eq!(detail.record_id, Some("42".to_string()));
        assert_eq!(detail.message, "upsert failed");
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: SyncError = toml_err.into();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_sync_error_implements_std_error() {
        let err = SyncError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
