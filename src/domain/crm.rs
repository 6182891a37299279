//! Bitrix24 CRM entities mirrored into the primary store

use crate::domain::ids::{DealId, LeadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A Bitrix24 deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub title: Option<String>,
    /// Full stage id, including the `C{n}:` pipeline prefix when present
    pub stage_id: Option<String>,
    pub category_id: Option<String>,
    pub lead_id: Option<LeadId>,
    pub contact_id: Option<i64>,
    pub opportunity: Option<f64>,
    pub currency: Option<String>,
    pub assigned_by_id: Option<i64>,
    pub created_date: Option<DateTime<Utc>>,
    pub modified_date: Option<DateTime<Utc>>,
    pub raw: Value,
}

/// Local lifecycle status of a negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Initial,
    FormFilled,
    InService,
    Won,
    Lost,
}

impl NegotiationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::FormFilled => "form_filled",
            Self::InService => "in_service",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegotiationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial" => Ok(Self::Initial),
            "form_filled" => Ok(Self::FormFilled),
            "in_service" => Ok(Self::InService),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => Err(format!("Unknown negotiation status: {other}")),
        }
    }
}

/// Negotiation derived from a deal's stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub deal_id: DealId,
    pub title: Option<String>,
    pub status: NegotiationStatus,
    pub stage_id: String,
    pub value: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_status_parse() {
        assert_eq!(
            "FORM_FILLED".parse::<NegotiationStatus>().unwrap(),
            NegotiationStatus::FormFilled
        );
        assert_eq!(NegotiationStatus::InService.to_string(), "in_service");
        assert!("pending".parse::<NegotiationStatus>().is_err());
    }

    #[test]
    fn test_negotiation_status_serde_matches_display() {
        let json = serde_json::to_string(&NegotiationStatus::Won).unwrap();
        assert_eq!(json, "\"won\"");
    }
}
