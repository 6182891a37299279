//! Bitrix24 lead field translation
//!
//! `crm.lead.get` answers with upper-case Bitrix names (`TITLE`,
//! `DATE_MODIFY`) and portal-specific `UF_CRM_*` custom fields. They are
//! renamed to the mapper's source names before mapping. The default table
//! covers the standard fields; custom fields come from `bitrix.lead_fields`.

use crate::domain::lead::RawLead;
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_LEAD_FIELDS: &[(&str, &str)] = &[
    ("ID", "id"),
    ("NAME", "name"),
    ("TITLE", "title"),
    ("ADDRESS", "address"),
    ("PHONE", "phone"),
    ("EMAIL", "email"),
    ("STATUS_ID", "stage"),
    ("ASSIGNED_BY_ID", "bitrix_telemarketing_id"),
    ("DATE_CREATE", "created_at"),
    ("DATE_MODIFY", "modified_at"),
];

/// Bitrix field name → mapper source name
#[derive(Debug, Clone)]
pub struct BitrixFieldMap {
    fields: HashMap<String, String>,
}

impl Default for BitrixFieldMap {
    fn default() -> Self {
        Self {
            fields: DEFAULT_LEAD_FIELDS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl BitrixFieldMap {
    /// Default table extended (and overridden) by configured entries
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut map = Self::default();
        map.fields
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }

    /// Target name for a Bitrix field
    pub fn target(&self, bitrix_field: &str) -> Option<&str> {
        self.fields.get(bitrix_field).map(String::as_str)
    }

    /// Renames the fields of a `crm.lead.get` result
    ///
    /// Original keys are kept so the raw payload stays intact. Multi-value
    /// fields (`PHONE`, `EMAIL`) collapse to their first `VALUE`.
    pub fn translate(&self, entity: &Value) -> RawLead {
        let mut raw = RawLead::from_value(entity.clone());
        let Some(object) = entity.as_object() else {
            return raw;
        };

        for (key, value) in object {
            if let Some(target) = self.target(key) {
                raw.insert(target, first_multifield_value(value));
            }
        }
        raw
    }
}

fn first_multifield_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("VALUE").filter(|v| !v.is_null()).cloned())
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transform::map_lead;
    use serde_json::json;

    #[test]
    fn test_translates_standard_fields() {
        let entity = json!({
            "ID": "55",
            "TITLE": "Lead do site",
            "STATUS_ID": "NEW",
            "PHONE": [{"ID": "1", "VALUE": "+5511988887777", "VALUE_TYPE": "WORK"}],
            "DATE_MODIFY": "2024-03-05T13:30:00+03:00"
        });

        let raw = BitrixFieldMap::default().translate(&entity);
        assert_eq!(raw.get("id"), Some(&json!("55")));
        assert_eq!(raw.get("phone"), Some(&json!("+5511988887777")));
        assert_eq!(raw.get("TITLE"), Some(&json!("Lead do site")));

        let lead = map_lead(&raw).unwrap();
        assert_eq!(lead.id.value(), 55);
        assert_eq!(lead.name.as_deref(), Some("Lead do site"));
        assert_eq!(lead.stage.as_deref(), Some("NEW"));
        assert_eq!(lead.phone.as_deref(), Some("+5511988887777"));
        assert!(lead.modified_at.is_some());
    }

    #[test]
    fn test_configured_custom_fields() {
        let overrides = HashMap::from([
            ("UF_CRM_SCOUTER".to_string(), "scouter".to_string()),
            ("UF_CRM_VALOR".to_string(), "valor_ficha".to_string()),
        ]);
        let entity = json!({"ID": 9, "UF_CRM_SCOUTER": "Bruna", "UF_CRM_VALOR": "R$ 50,00"});

        let lead = map_lead(&BitrixFieldMap::with_overrides(&overrides).translate(&entity)).unwrap();
        assert_eq!(lead.scouter.as_deref(), Some("Bruna"));
        assert_eq!(lead.ficha_value, Some(50.0));
    }

    #[test]
    fn test_empty_multifield_is_null() {
        let raw = BitrixFieldMap::default().translate(&json!({"ID": 1, "EMAIL": []}));
        assert!(raw.get("email").is_none());
    }
}
