//! Audit events
//!
//! One [`SyncEvent`] is appended per processed record, both for the export job
//! (outbound) and for webhook deliveries (inbound). Events are never updated.

use crate::domain::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Direction of the synchronization an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDirection {
    /// CRM → local store (webhooks)
    Inbound,
    /// Primary store → destination store (export job)
    Outbound,
}

impl EventDirection {
    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Outcome recorded for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Success,
    Error,
    Skipped,
}

impl EventStatus {
    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub id: Uuid,
    pub job_id: Option<JobId>,
    pub event_type: String,
    pub direction: EventDirection,
    pub record_id: Option<String>,
    pub status: EventStatus,
    pub duration_ms: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncEvent {
    /// Starts an event with the given type, direction and outcome
    pub fn new(event_type: impl Into<String>, direction: EventDirection, status: EventStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: None,
            event_type: event_type.into(),
            direction,
            record_id: None,
            status,
            duration_ms: 0,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let job_id = JobId::generate();
        let event = SyncEvent::new("lead_export", EventDirection::Outbound, EventStatus::Error)
            .with_job(job_id)
            .with_record("42")
            .with_duration(Duration::from_millis(17))
            .with_error("upsert failed");

        assert_eq!(event.job_id, Some(job_id));
        assert_eq!(event.record_id.as_deref(), Some("42"));
        assert_eq!(event.duration_ms, 17);
        assert_eq!(event.status.as_str(), "error");
        assert_eq!(event.direction.as_str(), "outbound");
    }
}
