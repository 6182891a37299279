//! Inbound Bitrix24 event parsing
//!
//! Bitrix posts outbound-webhook events as `application/x-www-form-urlencoded`
//! with bracketed keys:
//!
//! ```text
//! event=ONCRMDEALUPDATE&data[FIELDS][ID]=123&auth[application_token]=abc
//! ```
//!
//! Relays and manual replays send the same shape as JSON. Both decode to a
//! [`WebhookEvent`]; events outside the allow-list decode to
//! [`ParsedWebhook::Ignored`].

use crate::domain::{Result, SyncError};
use serde_json::Value;
use std::fmt;

/// CRM entity an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Deal,
    Lead,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Lead => "lead",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Add,
    Update,
    Delete,
}

/// Allow-listed event names
const ALLOWED_EVENTS: &[(&str, EntityKind, EventAction)] = &[
    ("ONCRMDEALADD", EntityKind::Deal, EventAction::Add),
    ("ONCRMDEALUPDATE", EntityKind::Deal, EventAction::Update),
    ("ONCRMDEALDELETE", EntityKind::Deal, EventAction::Delete),
    ("ONCRMLEADADD", EntityKind::Lead, EventAction::Add),
    ("ONCRMLEADUPDATE", EntityKind::Lead, EventAction::Update),
    ("ONCRMLEADDELETE", EntityKind::Lead, EventAction::Delete),
];

/// A classified, allow-listed event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Upper-cased event name, e.g. `ONCRMDEALUPDATE`
    pub name: String,
    pub entity: EntityKind,
    pub action: EventAction,
    /// Entity id from `data[FIELDS][ID]`
    pub entity_id: i64,
    /// `auth[application_token]`, when sent
    pub application_token: Option<String>,
}

/// Result of parsing a webhook body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedWebhook {
    Event(WebhookEvent),
    /// Well-formed but not on the allow-list
    Ignored { name: String },
}

/// Field values pulled out of either body encoding
#[derive(Debug, Default)]
struct RawFields {
    event: Option<String>,
    id: Option<String>,
    token: Option<String>,
}

/// Parses a webhook body
///
/// JSON is used when the content type says so or the body starts with `{`;
/// anything else is read as a form.
///
/// # Errors
///
/// [`SyncError::Webhook`] when the body has no event name, or an
/// allow-listed event carries no usable entity id.
pub fn parse_webhook(content_type: Option<&str>, body: &[u8]) -> Result<ParsedWebhook> {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
        || body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');

    let fields = if is_json {
        from_json(body)?
    } else {
        from_form(body)
    };

    let name = fields
        .event
        .map(|e| e.trim().to_ascii_uppercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| SyncError::Webhook("missing event name".to_string()))?;

    let Some((_, entity, action)) = ALLOWED_EVENTS.iter().find(|(allowed, _, _)| *allowed == name) else {
        return Ok(ParsedWebhook::Ignored { name });
    };

    let raw_id = fields
        .id
        .ok_or_else(|| SyncError::Webhook(format!("{name} without data[FIELDS][ID]")))?;
    let entity_id = raw_id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| SyncError::Webhook(format!("{name} with invalid id '{raw_id}'")))?;

    Ok(ParsedWebhook::Event(WebhookEvent {
        name,
        entity: *entity,
        action: *action,
        entity_id,
        application_token: fields.token.filter(|t| !t.is_empty()),
    }))
}

fn from_form(body: &[u8]) -> RawFields {
    let mut fields = RawFields::default();
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "event" => fields.event = Some(value.into_owned()),
            "data[FIELDS][ID]" => fields.id = Some(value.into_owned()),
            "auth[application_token]" => fields.token = Some(value.into_owned()),
            _ => {}
        }
    }
    fields
}

fn from_json(body: &[u8]) -> Result<RawFields> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| SyncError::Webhook(format!("invalid JSON body: {e}")))?;

    let as_text = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    Ok(RawFields {
        event: value.get("event").and_then(as_text),
        id: value.pointer("/data/FIELDS/ID").and_then(as_text),
        token: value.pointer("/auth/application_token").and_then(as_text),
    })
}
