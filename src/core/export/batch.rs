//! Per-batch record processing
//!
//! Each record goes map → upsert → audit event. A record that fails mapping
//! or upsert is counted as an error and the batch moves on.

use crate::adapters::database::traits::{EventLog, LeadSink};
use crate::core::transform::map_lead;
use crate::core::transform::mapper::ID_ALIASES;
use crate::domain::event::{EventDirection, EventStatus, SyncEvent};
use crate::domain::ids::JobId;
use crate::domain::lead::RawLead;
use crate::domain::{RecordErrorDetail, SyncError};
use std::sync::Arc;
use std::time::Instant;

/// `sync_source` written with exported leads
pub const EXPORT_SOURCE: &str = "export";

/// Event type of per-record export audit rows
pub const EXPORT_EVENT_TYPE: &str = "lead_export";

/// Outcome of one batch
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Records written (or that would have been, in dry-run mode)
    pub exported: usize,
    /// Records that failed mapping or upsert
    pub errors: usize,
    pub error_details: Vec<RecordErrorDetail>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self) {
        self.exported += 1;
    }

    pub fn add_failure(&mut self, detail: RecordErrorDetail) {
        self.errors += 1;
        self.error_details.push(detail);
    }

    /// Records seen by this batch
    pub fn processed(&self) -> usize {
        self.exported + self.errors
    }
}

/// Writes one batch of source rows to the destination
pub struct BatchProcessor {
    sink: Arc<dyn LeadSink + Send + Sync>,
    events: Arc<dyn EventLog + Send + Sync>,
    dry_run: bool,
}

impl BatchProcessor {
    pub fn new(
        sink: Arc<dyn LeadSink + Send + Sync>,
        events: Arc<dyn EventLog + Send + Sync>,
        dry_run: bool,
    ) -> Self {
        Self {
            sink,
            events,
            dry_run,
        }
    }

    /// Processes every row; never fails as a whole
    pub async fn process_batch(&self, job_id: JobId, rows: &[RawLead]) -> BatchResult {
        let mut result = BatchResult::new();

        for raw in rows {
            let started = Instant::now();
            let record_id = raw
                .first_of(ID_ALIASES)
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()));

            let outcome = self.export_record(raw).await;

            let mut event = match &outcome {
                Ok(()) => SyncEvent::new(EXPORT_EVENT_TYPE, EventDirection::Outbound, EventStatus::Success),
                Err(e) => SyncEvent::new(EXPORT_EVENT_TYPE, EventDirection::Outbound, EventStatus::Error)
                    .with_error(e.to_string()),
            }
            .with_job(job_id)
            .with_duration(started.elapsed());
            if let Some(id) = &record_id {
                event = event.with_record(id.clone());
            }

            match outcome {
                Ok(()) => result.add_success(),
                Err(e) => {
                    tracing::warn!(
                        job_id = %job_id,
                        record_id = record_id.as_deref().unwrap_or("<none>"),
                        error = %e,
                        "Failed to export lead, skipping"
                    );
                    let mut detail = RecordErrorDetail::new(e.to_string());
                    if let Some(id) = record_id {
                        detail = detail.with_record_id(id);
                    }
                    result.add_failure(detail);
                }
            }

            // The record outcome stands even if its audit row is lost
            if let Err(e) = self.events.append(&event).await {
                tracing::warn!(
                    job_id = %job_id,
                    record_id = event.record_id.as_deref().unwrap_or("<none>"),
                    error = %e,
                    "Failed to append sync event"
                );
            }
        }

        result
    }

    async fn export_record(&self, raw: &RawLead) -> Result<(), SyncError> {
        let lead = map_lead(raw)?;
        if self.dry_run {
            tracing::debug!(lead_id = %lead.id, "Dry run: skipping destination upsert");
            return Ok(());
        }
        self.sink.upsert_lead(&lead, EXPORT_SOURCE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use serde_json::json;

    fn rows() -> Vec<RawLead> {
        vec![
            RawLead::from_value(json!({"id": 1, "nome": "Ana"})),
            RawLead::from_value(json!({"nome": "Sem id"})),
            RawLead::from_value(json!({"id": "3", "nome": "Caio"})),
        ]
    }

    #[tokio::test]
    async fn test_mapping_error_is_counted_and_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let processor = BatchProcessor::new(store.clone(), store.clone(), false);

        let result = processor.process_batch(JobId::generate(), &rows()).await;

        assert_eq!(result.exported, 2);
        assert_eq!(result.errors, 1);
        assert_eq!(result.processed(), 3);
        assert_eq!(store.lead_count().await, 2);
        assert_eq!(store.lead_source_tag(3).await.as_deref(), Some(EXPORT_SOURCE));

        let events = store.events().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].status, EventStatus::Error);
        assert!(events[1].record_id.is_none());
        assert_eq!(events[2].record_id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_upsert_error_is_recorded() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_upsert_for(1).await;
        let processor = BatchProcessor::new(store.clone(), store.clone(), false);

        let result = processor.process_batch(JobId::generate(), &rows()[..1]).await;

        assert_eq!(result.errors, 1);
        assert_eq!(result.error_details[0].record_id.as_deref(), Some("1"));
        let events = store.events().await;
        assert_eq!(events[0].status, EventStatus::Error);
        assert!(events[0].error_message.as_deref().unwrap_or("").contains("rejected"));
    }

    #[tokio::test]
    async fn test_dry_run_skips_upsert() {
        let store = Arc::new(InMemoryStore::new());
        let processor = BatchProcessor::new(store.clone(), store.clone(), true);

        let result = processor.process_batch(JobId::generate(), &rows()).await;

        assert_eq!(result.exported, 2);
        assert_eq!(store.lead_count().await, 0);
        assert_eq!(store.events().await.len(), 3);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_counts() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_events().await;
        let processor = BatchProcessor::new(store.clone(), store.clone(), false);

        let result = processor.process_batch(JobId::generate(), &rows()).await;

        assert_eq!(result.exported, 2);
        assert_eq!(result.errors, 1);
        assert_eq!(store.lead_count().await, 2);
        assert!(store.events().await.is_empty());
    }
}
