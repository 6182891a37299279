//! Bitrix24 REST client against a mock server

use leadsync::adapters::bitrix::{BitrixClient, CrmApi};
use leadsync::config::{secret_string, BitrixConfig, RetryConfig};
use leadsync::domain::ids::{DealId, LeadId};
use leadsync::domain::{CrmError, SyncError};
use mockito::Matcher;
use serde_json::json;
use std::collections::HashMap;

fn client(base: &str, max_retries: usize) -> BitrixClient {
    let config = BitrixConfig {
        webhook_url: secret_string(format!("{base}/rest/1/tok3n")),
        application_token: None,
        timeout_seconds: 5,
        tls_verify: true,
        retry: RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        },
        lead_fields: HashMap::new(),
    };
    BitrixClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_get_deal_returns_result() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/1/tok3n/crm.deal.get.json")
        .match_query(Matcher::UrlEncoded("id".into(), "42".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"result": {"ID": "42", "STAGE_ID": "WON"}, "time": {}}).to_string())
        .create_async()
        .await;

    let deal = client(&server.url(), 0)
        .get_deal(DealId::new(42).unwrap())
        .await
        .unwrap();

    assert_eq!(deal["STAGE_ID"], "WON");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_envelope_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/1/tok3n/crm.lead.get.json")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(json!({"error": "", "error_description": "Not found"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let err = client(&server.url(), 3)
        .get_lead(LeadId::new(9).unwrap())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/1/tok3n/crm.deal.get.json")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("upstream unavailable")
        .expect(3)
        .create_async()
        .await;

    let err = client(&server.url(), 2)
        .get_deal(DealId::new(1).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Crm(CrmError::ServerError { status: 503, .. })
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/1/tok3n/crm.deal.get.json")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body(
            json!({"error": "QUERY_LIMIT_EXCEEDED", "error_description": "Too many requests"})
                .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let err = client(&server.url(), 1)
        .get_deal(DealId::new(1).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Crm(CrmError::Api { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/1/tok3n/crm.deal.get.json")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(
            json!({"error": "INVALID_CREDENTIALS", "error_description": "Invalid request credentials"})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let err = client(&server.url(), 3)
        .get_deal(DealId::new(1).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Crm(CrmError::Api { .. })));
    // The token never shows up in errors
    assert!(!err.to_string().contains("tok3n"));
    mock.assert_async().await;
}
