//! Bitrix24 REST response envelope

use crate::domain::CrmError;
use serde::Deserialize;
use serde_json::Value;

/// Body of every Bitrix24 REST answer
///
/// Success carries `result`; failure carries `error` and usually
/// `error_description`.
#[derive(Debug, Deserialize)]
pub struct BitrixEnvelope {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl BitrixEnvelope {
    /// Converts the envelope into the `result` payload or a typed error
    pub fn into_result(self, entity: &str) -> Result<Value, CrmError> {
        if let Some(code) = self.error {
            let description = self.error_description.unwrap_or_default();
            if is_not_found(&code, &description) {
                return Err(CrmError::NotFound(entity.to_string()));
            }
            return Err(CrmError::Api { code, description });
        }

        match self.result {
            Some(Value::Null) | None => Err(CrmError::NotFound(entity.to_string())),
            Some(result) => Ok(result),
        }
    }
}

/// Bitrix signals missing entities with a 400 and a "Not found" description
pub fn is_not_found(code: &str, description: &str) -> bool {
    code.eq_ignore_ascii_case("NOT_FOUND") || description.to_ascii_lowercase().contains("not found")
}
