//! PostgreSQL implementation of the storage traits

use crate::adapters::database::traits::{CrmStore, EventLog, JobStorage, LeadSink, LeadSource};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{job_from_row, stage_mapping_from_json, JOB_COLUMNS};
use crate::config::schema::validate_identifier;
use crate::core::state::job::ExportJob;
use crate::domain::crm::{Deal, Negotiation, NegotiationStatus};
use crate::domain::event::SyncEvent;
use crate::domain::ids::{DealId, JobId, LeadId};
use crate::domain::lead::{Lead, RawLead};
use crate::domain::{Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One PostgreSQL store
///
/// The leads table and its modification column come from configuration and
/// are interpolated into SQL, so both are checked as identifiers on
/// construction.
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    leads_table: String,
    modified_column: String,
}

impl PostgreSQLAdapter {
    /// # Errors
    ///
    /// [`StoreError::InvalidIdentifier`] for a table or column name that is not
    /// a plain identifier.
    pub fn new(
        client: Arc<PostgreSQLClient>,
        leads_table: impl Into<String>,
        modified_column: impl Into<String>,
    ) -> Result<Self> {
        let leads_table = leads_table.into();
        let modified_column = modified_column.into();
        validate_identifier("leads_table", &leads_table).map_err(StoreError::InvalidIdentifier)?;
        validate_identifier("modified_column", &modified_column)
            .map_err(StoreError::InvalidIdentifier)?;
        Ok(Self {
            client,
            leads_table,
            modified_column,
        })
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl LeadSource for PostgreSQLAdapter {
    async fn fetch_modified_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RawLead>> {
        let query = format!(
            "SELECT to_jsonb(l) AS record FROM {table} l \
             WHERE l.{col} >= $1 AND l.{col} < $2 \
             ORDER BY l.{col}, l.id \
             OFFSET $3 LIMIT $4",
            table = self.leads_table,
            col = self.modified_column,
        );

        let rows = self.client.query(&query, &[&from, &to, &offset, &limit]).await?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, Value>("record")
                    .map(RawLead::from_value)
                    .map_err(|e| StoreError::DecodeFailed(e.to_string()).into())
            })
            .collect()
    }
}

#[async_trait]
impl LeadSink for PostgreSQLAdapter {
    async fn upsert_lead(&self, lead: &Lead, source: &str) -> Result<()> {
        let statement = format!(
            r#"
            INSERT INTO {table} (
                id, name, age, address, phone, email, photo_url,
                scouter, commercial_project, project_id, telemarketing_operator,
                bitrix_telemarketing_id, approach_location,
                stage, flow_status, tabulation_status, ficha_value,
                ficha_confirmed, attendance_confirmed, attended, has_photo,
                created_at, ficha_created_at, ficha_confirmed_at, scheduled_at,
                schedule_time, modified_at, raw, sync_source, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, NOW())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                age = EXCLUDED.age,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                photo_url = EXCLUDED.photo_url,
                scouter = EXCLUDED.scouter,
                commercial_project = EXCLUDED.commercial_project,
                project_id = EXCLUDED.project_id,
                telemarketing_operator = EXCLUDED.telemarketing_operator,
                bitrix_telemarketing_id = EXCLUDED.bitrix_telemarketing_id,
                approach_location = EXCLUDED.approach_location,
                stage = EXCLUDED.stage,
                flow_status = EXCLUDED.flow_status,
                tabulation_status = EXCLUDED.tabulation_status,
                ficha_value = EXCLUDED.ficha_value,
                ficha_confirmed = EXCLUDED.ficha_confirmed,
                attendance_confirmed = EXCLUDED.attendance_confirmed,
                attended = EXCLUDED.attended,
                has_photo = EXCLUDED.has_photo,
                created_at = EXCLUDED.created_at,
                ficha_created_at = EXCLUDED.ficha_created_at,
                ficha_confirmed_at = EXCLUDED.ficha_confirmed_at,
                scheduled_at = EXCLUDED.scheduled_at,
                schedule_time = EXCLUDED.schedule_time,
                modified_at = EXCLUDED.modified_at,
                raw = EXCLUDED.raw,
                sync_source = EXCLUDED.sync_source,
                updated_at = NOW()
            "#,
            table = self.leads_table
        );

        let id = lead.id.value();
        self.client
            .execute_as(
                &statement,
                &[
                    &id,
                    &lead.name,
                    &lead.age,
                    &lead.address,
                    &lead.phone,
                    &lead.email,
                    &lead.photo_url,
                    &lead.scouter,
                    &lead.commercial_project,
                    &lead.project_id,
                    &lead.telemarketing_operator,
                    &lead.bitrix_telemarketing_id,
                    &lead.approach_location,
                    &lead.stage,
                    &lead.flow_status,
                    &lead.tabulation_status,
                    &lead.ficha_value,
                    &lead.ficha_confirmed,
                    &lead.attendance_confirmed,
                    &lead.attended,
                    &lead.has_photo,
                    &lead.created_at,
                    &lead.ficha_created_at,
                    &lead.ficha_confirmed_at,
                    &lead.scheduled_at,
                    &lead.schedule_time,
                    &lead.modified_at,
                    &lead.raw,
                    &source,
                ],
                StoreError::UpsertFailed,
            )
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl JobStorage for PostgreSQLAdapter {
    async fn insert_job(&self, job: &ExportJob) -> Result<()> {
        let statement = r#"
            INSERT INTO export_jobs (
                id, start_date, end_date, status, processing_date, processing_offset,
                total_leads, exported_leads, error_leads, last_completed_date,
                pause_reason, last_error, created_at, updated_at, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#;

        self.client
            .execute_as(
                statement,
                &[
                    job.id.as_uuid(),
                    &job.start_date,
                    &job.end_date,
                    &job.status.as_str(),
                    &job.processing_date,
                    &job.processing_offset,
                    &job.total_leads,
                    &job.exported_leads,
                    &job.error_leads,
                    &job.last_completed_date,
                    &job.pause_reason,
                    &job.last_error,
                    &job.created_at,
                    &job.updated_at,
                    &job.started_at,
                    &job.completed_at,
                ],
                StoreError::UpsertFailed,
            )
            .await?;
        Ok(())
    }

    async fn load_job(&self, job_id: JobId) -> Result<Option<ExportJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM export_jobs WHERE id = $1");
        self.client
            .query_opt(&query, &[job_id.as_uuid()])
            .await?
            .as_ref()
            .map(job_from_row)
            .transpose()
    }

    async fn save_status(&self, job: &ExportJob) -> Result<()> {
        let statement = r#"
            UPDATE export_jobs SET
                status = $2,
                pause_reason = $3,
                last_error = $4,
                started_at = $5,
                completed_at = $6,
                updated_at = $7
            WHERE id = $1
        "#;

        let updated = self
            .client
            .execute_as(
                statement,
                &[
                    job.id.as_uuid(),
                    &job.status.as_str(),
                    &job.pause_reason,
                    &job.last_error,
                    &job.started_at,
                    &job.completed_at,
                    &job.updated_at,
                ],
                StoreError::UpsertFailed,
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::UpsertFailed(format!("job {} not found", job.id)).into());
        }
        Ok(())
    }

    async fn save_progress(&self, job: &ExportJob) -> Result<()> {
        let statement = r#"
            UPDATE export_jobs SET
                processing_date = $2,
                processing_offset = $3,
                total_leads = $4,
                exported_leads = $5,
                error_leads = $6,
                last_completed_date = $7,
                updated_at = $8
            WHERE id = $1
        "#;

        let updated = self
            .client
            .execute_as(
                statement,
                &[
                    job.id.as_uuid(),
                    &job.processing_date,
                    &job.processing_offset,
                    &job.total_leads,
                    &job.exported_leads,
                    &job.error_leads,
                    &job.last_completed_date,
                    &job.updated_at,
                ],
                StoreError::UpsertFailed,
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::UpsertFailed(format!("job {} not found", job.id)).into());
        }
        Ok(())
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<ExportJob>> {
        let query =
            format!("SELECT {JOB_COLUMNS} FROM export_jobs ORDER BY created_at DESC LIMIT $1");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.client.query(&query, &[&limit]).await?;
        rows.iter().map(job_from_row).collect()
    }
}

#[async_trait]
impl EventLog for PostgreSQLAdapter {
    async fn append(&self, event: &SyncEvent) -> Result<()> {
        let statement = r#"
            INSERT INTO sync_events (
                id, job_id, event_type, direction, record_id, status,
                duration_ms, error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;

        let job_id = event.job_id.map(|id| *id.as_uuid());
        self.client
            .execute_as(
                statement,
                &[
                    &event.id,
                    &job_id,
                    &event.event_type,
                    &event.direction.as_str(),
                    &event.record_id,
                    &event.status.as_str(),
                    &event.duration_ms,
                    &event.error_message,
                    &event.created_at,
                ],
                StoreError::UpsertFailed,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CrmStore for PostgreSQLAdapter {
    async fn upsert_deal(&self, deal: &Deal) -> Result<()> {
        let statement = r#"
            INSERT INTO deals (
                bitrix_deal_id, title, stage_id, category_id, lead_id, contact_id,
                opportunity, currency, assigned_by_id, created_date, modified_date,
                raw, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (bitrix_deal_id) DO UPDATE SET
                title = EXCLUDED.title,
                stage_id = EXCLUDED.stage_id,
                category_id = EXCLUDED.category_id,
                lead_id = EXCLUDED.lead_id,
                contact_id = EXCLUDED.contact_id,
                opportunity = EXCLUDED.opportunity,
                currency = EXCLUDED.currency,
                assigned_by_id = EXCLUDED.assigned_by_id,
                created_date = EXCLUDED.created_date,
                modified_date = EXCLUDED.modified_date,
                raw = EXCLUDED.raw,
                updated_at = NOW()
        "#;

        let id = deal.id.value();
        let lead_id = deal.lead_id.map(|l| l.value());
        self.client
            .execute_as(
                statement,
                &[
                    &id,
                    &deal.title,
                    &deal.stage_id,
                    &deal.category_id,
                    &lead_id,
                    &deal.contact_id,
                    &deal.opportunity,
                    &deal.currency,
                    &deal.assigned_by_id,
                    &deal.created_date,
                    &deal.modified_date,
                    &deal.raw,
                ],
                StoreError::UpsertFailed,
            )
            .await?;
        Ok(())
    }

    async fn upsert_negotiation(&self, negotiation: &Negotiation) -> Result<()> {
        let statement = r#"
            INSERT INTO negotiations (bitrix_deal_id, title, status, stage_id, value, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (bitrix_deal_id) DO UPDATE SET
                title = EXCLUDED.title,
                status = EXCLUDED.status,
                stage_id = EXCLUDED.stage_id,
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
        "#;

        let id = negotiation.deal_id.value();
        self.client
            .execute_as(
                statement,
                &[
                    &id,
                    &negotiation.title,
                    &negotiation.status.as_str(),
                    &negotiation.stage_id,
                    &negotiation.value,
                    &negotiation.updated_at,
                ],
                StoreError::UpsertFailed,
            )
            .await?;
        Ok(())
    }

    async fn delete_negotiations_for_deal(&self, deal_id: DealId) -> Result<u64> {
        let id = deal_id.value();
        self.client
            .execute_as(
                "DELETE FROM negotiations WHERE bitrix_deal_id = $1",
                &[&id],
                StoreError::DeleteFailed,
            )
            .await
    }

    async fn delete_deal(&self, deal_id: DealId) -> Result<u64> {
        let id = deal_id.value();
        self.client
            .execute_as(
                "DELETE FROM deals WHERE bitrix_deal_id = $1",
                &[&id],
                StoreError::DeleteFailed,
            )
            .await
    }

    async fn delete_lead(&self, lead_id: LeadId) -> Result<u64> {
        let statement = format!("DELETE FROM {} WHERE id = $1", self.leads_table);
        let id = lead_id.value();
        self.client
            .execute_as(&statement, &[&id], StoreError::DeleteFailed)
            .await
    }

    async fn load_stage_overrides(
        &self,
        category_id: &str,
    ) -> Result<HashMap<String, NegotiationStatus>> {
        let row = self
            .client
            .query_opt(
                "SELECT stage_mapping FROM pipeline_configs WHERE category_id = $1",
                &[&category_id],
            )
            .await?;

        let Some(row) = row else {
            return Ok(HashMap::new());
        };
        let mapping: Value = row
            .try_get("stage_mapping")
            .map_err(|e| StoreError::DecodeFailed(e.to_string()))?;
        Ok(stage_mapping_from_json(category_id, &mapping))
    }
}
