//! Webhook processing pipeline
//!
//! parse → authenticate → enrich → persist, each a separate function over
//! plain values. [`WebhookProcessor::handle`] chains them and records one
//! inbound audit event per allow-listed event.

use super::event::{parse_webhook, EntityKind, EventAction, ParsedWebhook, WebhookEvent};
use super::stages::resolve_status;
use crate::adapters::bitrix::CrmApi;
use crate::adapters::database::traits::{CrmStore, EventLog, LeadSink};
use crate::config::SecretString;
use crate::core::transform::coerce::{parse_date, parse_int, parse_money, text};
use crate::core::transform::{map_lead, BitrixFieldMap};
use crate::domain::crm::{Deal, Negotiation, NegotiationStatus};
use crate::domain::event::{EventDirection, EventStatus, SyncEvent};
use crate::domain::ids::{DealId, LeadId};
use crate::domain::{Result, SyncError};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// `sync_source` written with leads that arrive through webhooks
pub const WEBHOOK_SOURCE: &str = "bitrix_webhook";

/// Category of deals without `CATEGORY_ID`
const DEFAULT_CATEGORY: &str = "0";

/// Full entity fetched from the CRM
#[derive(Debug, Clone, PartialEq)]
pub enum Enriched {
    Deal(Value),
    Lead(Value),
}

/// What handling an event did
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Entity written; `negotiation` tells whether a negotiation was derived
    Upserted {
        entity: EntityKind,
        id: i64,
        negotiation: bool,
    },
    /// Entity and its dependents removed
    Deleted {
        entity: EntityKind,
        id: i64,
        rows: u64,
    },
    /// The CRM no longer has the entity
    Skipped { entity: EntityKind, id: i64 },
    /// Event not on the allow-list
    Ignored { name: String },
}

/// Bitrix24 webhook pipeline
pub struct WebhookProcessor {
    crm: Arc<dyn CrmApi + Send + Sync>,
    store: Arc<dyn CrmStore + Send + Sync>,
    leads: Arc<dyn LeadSink + Send + Sync>,
    events: Arc<dyn EventLog + Send + Sync>,
    field_map: BitrixFieldMap,
    application_token: Option<SecretString>,
}

impl WebhookProcessor {
    pub fn new(
        crm: Arc<dyn CrmApi + Send + Sync>,
        store: Arc<dyn CrmStore + Send + Sync>,
        leads: Arc<dyn LeadSink + Send + Sync>,
        events: Arc<dyn EventLog + Send + Sync>,
    ) -> Self {
        Self {
            crm,
            store,
            leads,
            events,
            field_map: BitrixFieldMap::default(),
            application_token: None,
        }
    }

    pub fn with_field_map(mut self, field_map: BitrixFieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// Requires incoming events to carry this `auth[application_token]`
    pub fn with_application_token(mut self, token: Option<SecretString>) -> Self {
        self.application_token = token;
        self
    }

    /// Handles one raw webhook request
    ///
    /// # Errors
    ///
    /// [`SyncError::Webhook`] for malformed bodies, [`SyncError::Unauthorized`]
    /// for a token mismatch, and CRM or store errors from the later stages.
    /// A CRM "not found" is not an error: it yields
    /// [`WebhookOutcome::Skipped`].
    pub async fn handle(&self, content_type: Option<&str>, body: &[u8]) -> Result<WebhookOutcome> {
        let event = match parse_webhook(content_type, body)? {
            ParsedWebhook::Event(event) => event,
            ParsedWebhook::Ignored { name } => {
                tracing::debug!(event = %name, "Ignoring webhook event outside the allow-list");
                return Ok(WebhookOutcome::Ignored { name });
            }
        };

        self.authenticate(&event)?;

        let started = Instant::now();
        let result = self.process(&event).await;

        let audit = match &result {
            Ok(WebhookOutcome::Skipped { .. }) => {
                SyncEvent::new(&event.name, EventDirection::Inbound, EventStatus::Skipped)
                    .with_error("entity not found in CRM")
            }
            Ok(_) => SyncEvent::new(&event.name, EventDirection::Inbound, EventStatus::Success),
            Err(e) => SyncEvent::new(&event.name, EventDirection::Inbound, EventStatus::Error)
                .with_error(e.to_string()),
        }
        .with_record(event.entity_id.to_string())
        .with_duration(started.elapsed());

        if let Err(e) = self.events.append(&audit).await {
            tracing::warn!(event = %event.name, id = event.entity_id, error = %e, "Failed to append sync event");
        }

        match &result {
            Ok(outcome) => tracing::info!(event = %event.name, id = event.entity_id, outcome = ?outcome, "Webhook handled"),
            Err(e) => tracing::error!(event = %event.name, id = event.entity_id, error = %e, "Webhook failed"),
        }
        result
    }

    /// Checks the event's application token against the configured one
    pub fn authenticate(&self, event: &WebhookEvent) -> Result<()> {
        let Some(expected) = &self.application_token else {
            return Ok(());
        };
        match &event.application_token {
            Some(presented) if expected.expose_secret().matches(presented) => Ok(()),
            Some(_) => Err(SyncError::Unauthorized("application token mismatch".to_string())),
            None => Err(SyncError::Unauthorized("application token missing".to_string())),
        }
    }

    async fn process(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        if event.action == EventAction::Delete {
            return self.delete(event.entity, event.entity_id).await;
        }

        match self.enrich(event).await? {
            Some(entity) => self.persist(entity).await,
            None => Ok(WebhookOutcome::Skipped {
                entity: event.entity,
                id: event.entity_id,
            }),
        }
    }

    /// Fetches the full entity; `None` when the CRM no longer has it
    pub async fn enrich(&self, event: &WebhookEvent) -> Result<Option<Enriched>> {
        let fetched = match event.entity {
            EntityKind::Deal => {
                let id = DealId::new(event.entity_id).map_err(SyncError::Webhook)?;
                self.crm.get_deal(id).await.map(Enriched::Deal)
            }
            EntityKind::Lead => {
                let id = LeadId::new(event.entity_id).map_err(SyncError::Webhook)?;
                self.crm.get_lead(id).await.map(Enriched::Lead)
            }
        };

        match fetched {
            Ok(entity) => Ok(Some(entity)),
            Err(e) if e.is_not_found() => {
                tracing::info!(entity = %event.entity, id = event.entity_id, "Entity not found in CRM, skipping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes an enriched entity to the primary store
    pub async fn persist(&self, entity: Enriched) -> Result<WebhookOutcome> {
        match entity {
            Enriched::Deal(value) => {
                let deal = deal_from_entity(&value)?;
                self.store.upsert_deal(&deal).await?;

                let category = deal.category_id.as_deref().unwrap_or(DEFAULT_CATEGORY);
                let overrides = self.store.load_stage_overrides(category).await?;
                let negotiation = negotiation_for(&deal, &overrides);
                if let Some(negotiation) = &negotiation {
                    self.store.upsert_negotiation(negotiation).await?;
                } else {
                    // A negotiation left from an earlier stage would no longer match the deal
                    let removed = self.store.delete_negotiations_for_deal(deal.id).await?;
                    tracing::debug!(
                        deal_id = %deal.id,
                        stage = ?deal.stage_id,
                        removed,
                        "Stage has no negotiation status"
                    );
                }

                Ok(WebhookOutcome::Upserted {
                    entity: EntityKind::Deal,
                    id: deal.id.value(),
                    negotiation: negotiation.is_some(),
                })
            }
            Enriched::Lead(value) => {
                let raw = self.field_map.translate(&value);
                let lead = map_lead(&raw)?;
                self.leads.upsert_lead(&lead, WEBHOOK_SOURCE).await?;
                Ok(WebhookOutcome::Upserted {
                    entity: EntityKind::Lead,
                    id: lead.id.value(),
                    negotiation: false,
                })
            }
        }
    }

    /// Removes an entity, dependents first
    pub async fn delete(&self, entity: EntityKind, id: i64) -> Result<WebhookOutcome> {
        let rows = match entity {
            EntityKind::Deal => {
                let deal_id = DealId::new(id).map_err(SyncError::Webhook)?;
                let negotiations = self.store.delete_negotiations_for_deal(deal_id).await?;
                negotiations + self.store.delete_deal(deal_id).await?
            }
            EntityKind::Lead => {
                let lead_id = LeadId::new(id).map_err(SyncError::Webhook)?;
                self.store.delete_lead(lead_id).await?
            }
        };
        Ok(WebhookOutcome::Deleted { entity, id, rows })
    }
}

/// Builds a [`Deal`] from a `crm.deal.get` result
///
/// # Errors
///
/// [`SyncError::Webhook`] when the result has no valid `ID`.
pub fn deal_from_entity(entity: &Value) -> Result<Deal> {
    let field = |name: &str| entity.get(name).filter(|v| !v.is_null());

    let id = field("ID")
        .and_then(parse_int)
        .ok_or_else(|| SyncError::Webhook("deal without ID".to_string()))
        .and_then(|id| DealId::new(id).map_err(SyncError::Webhook))?;

    Ok(Deal {
        id,
        title: field("TITLE").and_then(text),
        stage_id: field("STAGE_ID").and_then(text),
        category_id: field("CATEGORY_ID").and_then(text),
        lead_id: field("LEAD_ID")
            .and_then(parse_int)
            .and_then(|id| LeadId::new(id).ok()),
        contact_id: field("CONTACT_ID").and_then(parse_int).filter(|id| *id > 0),
        opportunity: field("OPPORTUNITY").and_then(parse_money),
        currency: field("CURRENCY_ID").and_then(text),
        assigned_by_id: field("ASSIGNED_BY_ID").and_then(parse_int),
        created_date: field("DATE_CREATE").and_then(parse_date),
        modified_date: field("DATE_MODIFY").and_then(parse_date),
        raw: entity.clone(),
    })
}

/// Derives the negotiation of a deal, if its stage maps to a status
pub fn negotiation_for(
    deal: &Deal,
    overrides: &HashMap<String, NegotiationStatus>,
) -> Option<Negotiation> {
    let stage_id = deal.stage_id.as_deref()?;
    let status = resolve_status(stage_id, overrides)?;
    Some(Negotiation {
        deal_id: deal.id,
        title: deal.title.clone(),
        status,
        stage_id: stage_id.to_string(),
        value: deal.opportunity,
        updated_at: Utc::now(),
    })
}
