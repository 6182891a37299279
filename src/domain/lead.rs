//! Lead records
//!
//! A lead ("ficha") exists in two shapes:
//!
//! - [`RawLead`]: the source row as a loose JSON object. Field types are not
//!   trusted; every read goes through a coercion.
//! - [`Lead`]: the typed destination row produced by the field mapper.

use crate::domain::ids::LeadId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source lead record with untrusted field types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawLead(Map<String, Value>);

impl RawLead {
    /// Wraps a JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds a raw lead from any JSON value; non-objects yield an empty record
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Returns a field, treating JSON null as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Returns the first non-null field among `keys`
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Sets a field
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the underlying object
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields present
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for RawLead {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Typed lead row as written to the destination store
///
/// Every column but `id` is optional; the destination accepts nulls for all
/// of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Primary key
    pub id: LeadId,

    // Identity and contact
    pub name: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,

    // Attribution
    pub scouter: Option<String>,
    pub commercial_project: Option<String>,
    pub project_id: Option<String>,
    pub telemarketing_operator: Option<String>,
    pub bitrix_telemarketing_id: Option<i64>,
    pub approach_location: Option<String>,

    // Funnel
    pub stage: Option<String>,
    pub flow_status: Option<String>,
    pub tabulation_status: Option<String>,

    /// Monetary value of the ficha
    pub ficha_value: Option<f64>,

    // Flags
    pub ficha_confirmed: Option<bool>,
    pub attendance_confirmed: Option<bool>,
    pub attended: Option<bool>,
    pub has_photo: Option<bool>,

    // Dates
    pub created_at: Option<DateTime<Utc>>,
    pub ficha_created_at: Option<DateTime<Utc>>,
    pub ficha_confirmed_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub schedule_time: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,

    /// Original source payload
    pub raw: Value,
}

impl Lead {
    /// Creates a lead with only its id set
    pub fn with_id(id: LeadId) -> Self {
        Self {
            id,
            name: None,
            age: None,
            address: None,
            phone: None,
            email: None,
            photo_url: None,
            scouter: None,
            commercial_project: None,
            project_id: None,
            telemarketing_operator: None,
            bitrix_telemarketing_id: None,
            approach_location: None,
            stage: None,
            flow_status: None,
            tabulation_status: None,
            ficha_value: None,
            ficha_confirmed: None,
            attendance_confirmed: None,
            attended: None,
            has_photo: None,
            created_at: None,
            ficha_created_at: None,
            ficha_confirmed_at: None,
            scheduled_at: None,
            schedule_time: None,
            modified_at: None,
            raw: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_lead_get_skips_null() {
        let raw = RawLead::from_value(json!({"id": 1, "nome": null, "name": "Ana"}));
        assert!(raw.get("nome").is_none());
        assert_eq!(raw.first_of(&["nome", "name"]), Some(&json!("Ana")));
    }

    #[test]
    fn test_raw_lead_from_non_object() {
        let raw = RawLead::from_value(json!([1, 2, 3]));
        assert!(raw.is_empty());
    }

    #[test]
    fn test_lead_serializes_dates_as_iso() {
        let mut lead = Lead::with_id(LeadId::new(9).unwrap());
        lead.created_at = Some("2024-03-05T10:30:00Z".parse().unwrap());
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["created_at"], "2024-03-05T10:30:00Z");
        assert_eq!(json["id"], 9);
        assert!(json["name"].is_null());
    }
}
