//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use leadsync::adapters::bitrix::CrmApi;
use leadsync::adapters::memory::InMemoryStore;
use leadsync::core::export::{BatchProcessor, DriverSettings, ExportDriver};
use leadsync::core::state::JobLedger;
use leadsync::domain::ids::{DealId, LeadId};
use leadsync::domain::{CrmError, RawLead, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A source row with generated contact data
pub fn fake_lead(id: i64) -> RawLead {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    let phone: String = PhoneNumber().fake();
    RawLead::from_value(json!({
        "id": id,
        "name": name,
        "email": email,
        "phone": phone,
        "age": (18..60).fake::<i64>().to_string(),
        "valor_ficha": "R$ 1.250,00",
        "criado": "05/03/2024 10:30:00",
    }))
}

/// Seeds `count` leads modified at noon on `day`, ids from `first_id`
pub async fn seed_day(store: &InMemoryStore, day: NaiveDate, first_id: i64, count: i64) {
    let at = Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap());
    for id in first_id..first_id + count {
        store.seed_lead(at, fake_lead(id)).await;
    }
}

pub fn settings(batch_size: usize, floor_date: NaiveDate) -> DriverSettings {
    DriverSettings {
        batch_size,
        batch_delay: Duration::ZERO,
        floor_date,
    }
}

/// Driver whose source, sink, ledger and audit log are all `store`
pub fn driver(
    store: &Arc<InMemoryStore>,
    settings: DriverSettings,
    shutdown: watch::Receiver<bool>,
) -> ExportDriver {
    ExportDriver::new(
        JobLedger::new(store.clone()),
        store.clone(),
        BatchProcessor::new(store.clone(), store.clone(), false),
        settings,
        shutdown,
    )
}

/// CRM double serving entities from memory
#[derive(Default)]
pub struct StaticCrm {
    deals: Mutex<HashMap<i64, Value>>,
    leads: Mutex<HashMap<i64, Value>>,
    calls: Mutex<Vec<String>>,
}

impl StaticCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_deal(&self, id: i64, entity: Value) {
        self.deals.lock().await.insert(id, entity);
    }

    pub async fn put_lead(&self, id: i64, entity: Value) {
        self.leads.lock().await.insert(id, entity);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CrmApi for StaticCrm {
    async fn get_deal(&self, id: DealId) -> Result<Value> {
        self.calls.lock().await.push(format!("crm.deal.get:{id}"));
        self.deals
            .lock()
            .await
            .get(&id.value())
            .cloned()
            .ok_or_else(|| CrmError::NotFound(format!("deal {id}")).into())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Value> {
        self.calls.lock().await.push(format!("crm.lead.get:{id}"));
        self.leads
            .lock()
            .await
            .get(&id.value())
            .cloned()
            .ok_or_else(|| CrmError::NotFound(format!("lead {id}")).into())
    }
}
