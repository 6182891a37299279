//! Credential wrappers
//!
//! Database connection strings, the Bitrix24 webhook URL (which embeds the
//! REST token in its path) and the webhook application token are held in
//! `secrecy` containers. The inner value is zeroed on drop and never shows up
//! in `Debug` output.
//!
//! ```rust
//! use leadsync::config::{secret_string, redact_url};
//! use secrecy::ExposeSecret;
//!
//! let url = secret_string("https://acme.bitrix24.com.br/rest/1/abc123/".to_string());
//! assert_eq!(url.expose_secret().as_ref(), "https://acme.bitrix24.com.br/rest/1/abc123/");
//! assert_eq!(redact_url(url.expose_secret().as_ref()), "https://acme.bitrix24.com.br/rest/***");
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
#[derive(Clone, Debug, Default, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Compares against a presented credential without short-circuiting on
    /// the first differing byte
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A zeroizing, debug-redacted string
pub type SecretString = Secret<SecretValue>;

#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value.map(secret_string)
}

/// Strips everything after `/rest/` from a Bitrix24 webhook URL so it can be
/// logged
pub fn redact_url(url: &str) -> String {
    match url.find("/rest/") {
        Some(idx) => format!("{}/rest/***", &url[..idx]),
        None => match url::Url::parse(url) {
            Ok(parsed) => format!("{}://{}/***", parsed.scheme(), parsed.host_str().unwrap_or("")),
            Err(_) => "***".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_matches() {
        let token = secret_string("s3cr3t".to_string());
        assert!(token.expose_secret().matches("s3cr3t"));
        assert!(!token.expose_secret().matches("s3cr3T"));
        assert!(!token.expose_secret().matches("s3cr3t-longer"));
        assert!(!token.expose_secret().matches(""));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("postgres://user:hunter2@db/leads".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_secret_opt_and_empty() {
        assert!(secret_string_opt(None).is_none());
        let blank = secret_string("   ".to_string());
        assert!(blank.expose_secret().is_empty());
    }

    #[test]
    fn test_secret_deserializes_from_plain_string() {
        #[derive(Deserialize)]
        struct Section {
            token: SecretString,
        }
        let section: Section = toml::from_str(r#"token = "abc""#).unwrap();
        assert_eq!(section.token.expose_secret().as_ref(), "abc");
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("https://acme.bitrix24.com.br/rest/7/tok/"),
            "https://acme.bitrix24.com.br/rest/***"
        );
        assert_eq!(redact_url("https://crm.example.com/hook"), "https://crm.example.com/***");
        assert_eq!(redact_url("not a url"), "***");
    }
}
