//! Bitrix24 REST client
//!
//! Calls `<webhook_url>/<method>.json` with query parameters. The webhook URL
//! embeds the access token, so it is only ever logged through
//! [`redact_url`].

use super::models::{is_not_found, BitrixEnvelope};
use super::CrmApi;
use crate::config::schema::{BitrixConfig, RetryConfig};
use crate::config::redact_url;
use crate::domain::ids::{DealId, LeadId};
use crate::domain::{CrmError, Result, SyncError};
use crate::log_retry_attempt;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Bitrix24 inbound-webhook REST client
pub struct BitrixClient {
    base_url: Url,
    client: Client,
    retry: RetryConfig,
}

impl BitrixClient {
    /// # Errors
    ///
    /// Configuration error for an unparseable webhook URL or when the HTTP
    /// client cannot be built.
    pub fn new(config: &BitrixConfig) -> Result<Self> {
        let raw: &str = config.webhook_url.expose_secret().as_ref();
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            SyncError::Configuration(format!("Invalid bitrix.webhook_url ({}): {e}", redact_url(raw)))
        })?;

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(10)));
        if !config.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            retry: config.retry.clone(),
        })
    }

    /// Calls one REST method and returns its `result`
    pub async fn call(&self, method: &str, params: &[(&str, String)], entity: &str) -> Result<Value> {
        let mut url = self
            .base_url
            .join(&format!("{method}.json"))
            .map_err(|e| SyncError::Other(format!("Invalid method {method}: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        tracing::debug!(method, entity, "Calling Bitrix24 REST API");

        self.retry_request(|| self.send_once(url.clone(), entity)).await
    }

    async fn send_once(&self, url: Url, entity: &str) -> Result<Value> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CrmError::Timeout(strip_url(e))
            } else {
                CrmError::ConnectionFailed(strip_url(e))
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CrmError::InvalidResponse(strip_url(e)))?;

        // Bitrix answers errors with a JSON envelope under most statuses
        let envelope = serde_json::from_str::<BitrixEnvelope>(&body).ok();

        match (status, envelope) {
            (StatusCode::OK, Some(envelope)) => Ok(envelope.into_result(entity)?),
            (StatusCode::OK, None) => {
                Err(CrmError::InvalidResponse(format!("non-JSON body for {entity}")).into())
            }
            (StatusCode::NOT_FOUND, _) => Err(CrmError::NotFound(entity.to_string()).into()),
            (status, Some(envelope)) if envelope.error.is_some() => {
                let code = envelope.error.clone().unwrap_or_default();
                let description = envelope.error_description.clone().unwrap_or_default();
                if is_not_found(&code, &description) {
                    return Err(CrmError::NotFound(entity.to_string()).into());
                }
                if status.is_server_error() {
                    return Err(CrmError::ServerError {
                        status: status.as_u16(),
                        message: format!("{code}: {description}"),
                    }
                    .into());
                }
                Err(CrmError::Api { code, description }.into())
            }
            (status, _) if status.is_server_error() => Err(CrmError::ServerError {
                status: status.as_u16(),
                message: truncate(&body),
            }
            .into()),
            (status, _) => Err(CrmError::ClientError {
                status: status.as_u16(),
                message: truncate(&body),
            }
            .into()),
        }
    }

    /// Retries retryable CRM errors with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.retry.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(SyncError::Crm(e)) if e.is_retryable() && attempt < max_attempts => {
                    let delay_ms = backoff_delay_ms(&self.retry, attempt);
                    log_retry_attempt!(attempt, max_attempts, e);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl CrmApi for BitrixClient {
    async fn get_deal(&self, id: DealId) -> Result<Value> {
        self.call("crm.deal.get", &[("id", id.to_string())], &format!("deal {id}"))
            .await
    }

    async fn get_lead(&self, id: LeadId) -> Result<Value> {
        self.call("crm.lead.get", &[("id", id.to_string())], &format!("lead {id}"))
            .await
    }
}

/// Delay before retry number `attempt` (1-based)
fn backoff_delay_ms(retry: &RetryConfig, attempt: usize) -> u64 {
    let exponent = attempt.saturating_sub(1) as i32;
    let delay = retry.initial_delay_ms as f64 * retry.backoff_multiplier.powi(exponent);
    (delay as u64).min(retry.max_delay_ms)
}

// reqwest errors print the request URL, which carries the token
fn strip_url(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
