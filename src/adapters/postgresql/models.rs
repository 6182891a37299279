//! Row conversions
//!
//! Maps `tokio_postgres` rows to domain types. Every column read uses
//! `try_get` so a schema drift surfaces as [`StoreError::DecodeFailed`]
//! instead of a panic.

use crate::core::state::job::{ExportJob, JobStatus};
use crate::domain::crm::NegotiationStatus;
use crate::domain::ids::JobId;
use crate::domain::{Result, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

/// Columns selected for an [`ExportJob`]
pub const JOB_COLUMNS: &str = "id, start_date, end_date, status, processing_date, \
    processing_offset, total_leads, exported_leads, error_leads, last_completed_date, \
    pause_reason, last_error, created_at, updated_at, started_at, completed_at";

fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| StoreError::DecodeFailed(format!("column {name}: {e}")).into())
}

/// Decodes an `export_jobs` row
pub fn job_from_row(row: &Row) -> Result<ExportJob> {
    let status: String = column(row, "status")?;
    let status: JobStatus = status.parse().map_err(StoreError::DecodeFailed)?;

    Ok(ExportJob {
        id: JobId::from_uuid(column(row, "id")?),
        start_date: column(row, "start_date")?,
        end_date: column(row, "end_date")?,
        status,
        processing_date: column(row, "processing_date")?,
        processing_offset: column(row, "processing_offset")?,
        total_leads: column(row, "total_leads")?,
        exported_leads: column(row, "exported_leads")?,
        error_leads: column(row, "error_leads")?,
        last_completed_date: column(row, "last_completed_date")?,
        pause_reason: column(row, "pause_reason")?,
        last_error: column(row, "last_error")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
        started_at: column(row, "started_at")?,
        completed_at: column(row, "completed_at")?,
    })
}

/// Parses a `pipeline_configs.stage_mapping` document
///
/// Keys are stage ids (a `C{n}:` prefix is removed), values are negotiation
/// status names. Entries with unknown status names are dropped.
pub fn stage_mapping_from_json(category_id: &str, value: &Value) -> HashMap<String, NegotiationStatus> {
    let Some(object) = value.as_object() else {
        tracing::warn!(category_id, "stage_mapping is not a JSON object; ignoring");
        return HashMap::new();
    };

    object
        .iter()
        .filter_map(|(stage, status)| {
            let parsed = status.as_str().and_then(|s| s.parse::<NegotiationStatus>().ok());
            if parsed.is_none() {
                tracing::warn!(category_id, stage = %stage, status = %status, "Unknown status in stage_mapping");
            }
            parsed.map(|s| (crate::core::webhook::stages::strip_pipeline_prefix(stage).to_string(), s))
        })
        .collect()
}
