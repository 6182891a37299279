//! Domain identifier types with validation
//!
//! Newtype wrappers for job and CRM identifiers. Bitrix24 sends numeric ids
//! as strings (`"ID": "1234"`), so the CRM ids parse from either form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Export job identifier
///
/// # Examples
///
/// ```
/// use leadsync::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let id = JobId::from_str("1b4e28ba-2fa1-41d2-883f-0016d3cca427").unwrap();
/// assert_eq!(id.to_string(), "1b4e28ba-2fa1-41d2-883f-0016d3cca427");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a new random job id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid job id '{s}': {e}"))
    }
}

macro_rules! crm_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an id, rejecting zero and negative values
            pub fn new(id: i64) -> Result<Self, String> {
                if id <= 0 {
                    return Err(format!("{} must be positive, got {}", $label, id));
                }
                Ok(Self(id))
            }

            /// Returns the numeric value
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(format!("{} cannot be empty", $label));
                }
                let id = trimmed
                    .parse::<i64>()
                    .map_err(|_| format!("{} is not numeric: {}", $label, s))?;
                Self::new(id)
            }
        }
    };
}

crm_id!(
    /// Lead identifier (primary key of the leads tables and the Bitrix24 lead id)
    LeadId,
    "Lead ID"
);

crm_id!(
    /// Bitrix24 deal identifier
    DealId,
    "Deal ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_roundtrip_display() {
        let id = JobId::generate();
        let parsed = JobId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_job_id_invalid() {
        assert!(JobId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_lead_id_from_numeric_string() {
        let id: LeadId = " 1234 ".parse().unwrap();
        assert_eq!(id.value(), 1234);
        assert_eq!(id.to_string(), "1234");
    }

    #[test]
    fn test_lead_id_rejects_non_positive() {
        assert!(LeadId::new(0).is_err());
        assert!(LeadId::new(-5).is_err());
        assert!("".parse::<LeadId>().is_err());
        assert!("abc".parse::<LeadId>().is_err());
    }

    #[test]
    fn test_deal_id_serialization_is_transparent() {
        let id = DealId::new(77).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "77");
    }
}
