//! In-memory store
//!
//! Implements every storage trait over plain collections for the unit and
//! integration tests. Failures can be injected per operation to exercise the
//! driver's error paths.

use crate::adapters::database::traits::{CrmStore, EventLog, JobStorage, LeadSink, LeadSource};
use crate::core::state::job::ExportJob;
use crate::domain::crm::{Deal, Negotiation, NegotiationStatus};
use crate::domain::event::SyncEvent;
use crate::domain::ids::{DealId, JobId, LeadId};
use crate::domain::lead::{Lead, RawLead};
use crate::domain::{Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    source: Vec<(DateTime<Utc>, RawLead)>,
    leads: HashMap<LeadId, (Lead, String)>,
    jobs: HashMap<JobId, ExportJob>,
    events: Vec<SyncEvent>,
    deals: HashMap<DealId, Deal>,
    negotiations: HashMap<DealId, Negotiation>,
    stage_overrides: HashMap<String, HashMap<String, NegotiationStatus>>,
    deletions: Vec<String>,
    fail_fetch: Option<String>,
    fail_upsert: HashSet<i64>,
    fail_events: bool,
    fetch_calls: usize,
}

/// Store backed by in-process collections
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source lead modified at `modified_at`
    pub async fn seed_lead(&self, modified_at: DateTime<Utc>, raw: RawLead) {
        self.state.lock().await.source.push((modified_at, raw));
    }

    pub async fn seed_stage_overrides(
        &self,
        category_id: &str,
        overrides: HashMap<String, NegotiationStatus>,
    ) {
        self.state
            .lock()
            .await
            .stage_overrides
            .insert(category_id.to_string(), overrides);
    }

    pub async fn seed_negotiation(&self, negotiation: Negotiation) {
        self.state
            .lock()
            .await
            .negotiations
            .insert(negotiation.deal_id, negotiation);
    }

    /// Makes every subsequent source read fail with `message`
    pub async fn fail_fetch(&self, message: impl Into<String>) {
        self.state.lock().await.fail_fetch = Some(message.into());
    }

    /// Makes upserts of the given lead id fail
    pub async fn fail_upsert_for(&self, lead_id: i64) {
        self.state.lock().await.fail_upsert.insert(lead_id);
    }

    /// Makes audit appends fail
    pub async fn fail_events(&self) {
        self.state.lock().await.fail_events = true;
    }

    pub async fn lead(&self, lead_id: i64) -> Option<Lead> {
        let id = LeadId::new(lead_id).ok()?;
        self.state.lock().await.leads.get(&id).map(|(lead, _)| lead.clone())
    }

    pub async fn lead_source_tag(&self, lead_id: i64) -> Option<String> {
        let id = LeadId::new(lead_id).ok()?;
        self.state.lock().await.leads.get(&id).map(|(_, tag)| tag.clone())
    }

    pub async fn lead_count(&self) -> usize {
        self.state.lock().await.leads.len()
    }

    pub async fn events(&self) -> Vec<SyncEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn deal(&self, deal_id: i64) -> Option<Deal> {
        let id = DealId::new(deal_id).ok()?;
        self.state.lock().await.deals.get(&id).cloned()
    }

    pub async fn negotiation(&self, deal_id: i64) -> Option<Negotiation> {
        let id = DealId::new(deal_id).ok()?;
        self.state.lock().await.negotiations.get(&id).cloned()
    }

    /// Delete operations in the order they ran, e.g. `negotiations:7`, `deal:7`
    pub async fn deletions(&self) -> Vec<String> {
        self.state.lock().await.deletions.clone()
    }

    /// Number of source reads served so far
    pub async fn fetch_calls(&self) -> usize {
        self.state.lock().await.fetch_calls
    }
}

fn sort_key(raw: &RawLead) -> i64 {
    raw.get("id")
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .unwrap_or(i64::MAX)
}

#[async_trait]
impl LeadSource for InMemoryStore {
    async fn fetch_modified_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RawLead>> {
        let mut state = self.state.lock().await;
        state.fetch_calls += 1;

        if let Some(message) = &state.fail_fetch {
            return Err(StoreError::QueryFailed(message.clone()).into());
        }

        let mut window: Vec<&(DateTime<Utc>, RawLead)> = state
            .source
            .iter()
            .filter(|(modified, _)| *modified >= from && *modified < to)
            .collect();
        window.sort_by_key(|(modified, raw)| (*modified, sort_key(raw)));

        Ok(window
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(_, raw)| raw.clone())
            .collect())
    }
}

#[async_trait]
impl LeadSink for InMemoryStore {
    async fn upsert_lead(&self, lead: &Lead, source: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_upsert.contains(&lead.id.value()) {
            return Err(StoreError::UpsertFailed(format!("lead {} rejected", lead.id)).into());
        }
        state
            .leads
            .insert(lead.id, (lead.clone(), source.to_string()));
        Ok(())
    }
}

#[async_trait]
impl JobStorage for InMemoryStore {
    async fn insert_job(&self, job: &ExportJob) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.jobs.contains_key(&job.id) {
            return Err(StoreError::UpsertFailed(format!("job {} already exists", job.id)).into());
        }
        state.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn load_job(&self, job_id: JobId) -> Result<Option<ExportJob>> {
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn save_status(&self, job: &ExportJob) -> Result<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| StoreError::UpsertFailed(format!("job {} missing", job.id)))?;
        stored.status = job.status;
        stored.pause_reason = job.pause_reason.clone();
        stored.last_error = job.last_error.clone();
        stored.started_at = job.started_at;
        stored.completed_at = job.completed_at;
        stored.updated_at = job.updated_at;
        Ok(())
    }

    async fn save_progress(&self, job: &ExportJob) -> Result<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| StoreError::UpsertFailed(format!("job {} missing", job.id)))?;
        stored.processing_date = job.processing_date;
        stored.processing_offset = job.processing_offset;
        stored.total_leads = job.total_leads;
        stored.exported_leads = job.exported_leads;
        stored.error_leads = job.error_leads;
        stored.last_completed_date = job.last_completed_date;
        stored.updated_at = job.updated_at;
        Ok(())
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<ExportJob>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<ExportJob> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}

#[async_trait]
impl EventLog for InMemoryStore {
    async fn append(&self, event: &SyncEvent) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_events {
            return Err(StoreError::UpsertFailed("sync_events unavailable".to_string()).into());
        }
        state.events.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl CrmStore for InMemoryStore {
    async fn upsert_deal(&self, deal: &Deal) -> Result<()> {
        self.state.lock().await.deals.insert(deal.id, deal.clone());
        Ok(())
    }

    async fn upsert_negotiation(&self, negotiation: &Negotiation) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.deals.contains_key(&negotiation.deal_id) {
            return Err(StoreError::UpsertFailed(format!(
                "negotiation references missing deal {}",
                negotiation.deal_id
            ))
            .into());
        }
        state
            .negotiations
            .insert(negotiation.deal_id, negotiation.clone());
        Ok(())
    }

    async fn delete_negotiations_for_deal(&self, deal_id: DealId) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.deletions.push(format!("negotiations:{deal_id}"));
        Ok(u64::from(state.negotiations.remove(&deal_id).is_some()))
    }

    async fn delete_deal(&self, deal_id: DealId) -> Result<u64> {
        let mut state = self.state.lock().await;
        // Mirrors the foreign key from negotiations to deals
        if state.negotiations.contains_key(&deal_id) {
            return Err(StoreError::DeleteFailed(format!(
                "deal {deal_id} still referenced by a negotiation"
            ))
            .into());
        }
        state.deletions.push(format!("deal:{deal_id}"));
        Ok(u64::from(state.deals.remove(&deal_id).is_some()))
    }

    async fn delete_lead(&self, lead_id: LeadId) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.deletions.push(format!("lead:{lead_id}"));
        Ok(u64::from(state.leads.remove(&lead_id).is_some()))
    }

    async fn load_stage_overrides(
        &self,
        category_id: &str,
    ) -> Result<HashMap<String, NegotiationStatus>> {
        Ok(self
            .state
            .lock()
            .await
            .stage_overrides
            .get(category_id)
            .cloned()
            .unwrap_or_default())
    }
}
