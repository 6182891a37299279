//! HTTP surface
//!
//! | Route                     | Purpose                               |
//! |---------------------------|---------------------------------------|
//! | `POST /webhooks/bitrix`   | Bitrix24 outbound webhook receiver    |
//! | `POST /export-jobs`       | create / pause / resume export jobs   |
//! | `GET /export-jobs/{id}`   | job row                               |
//! | `GET /health`             | liveness                              |

pub mod error;

pub use error::ApiError;

use crate::core::control::{JobCommand, JobController};
use crate::core::state::JobLedger;
use crate::core::webhook::{WebhookOutcome, WebhookProcessor};
use crate::domain::ids::JobId;
use crate::domain::{Result, SyncError};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub ledger: JobLedger,
    pub controller: Arc<JobController>,
    pub webhooks: Arc<WebhookProcessor>,
}

/// Builds the router over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/bitrix", post(bitrix_webhook))
        .route("/export-jobs", post(job_command))
        .route("/export-jobs/{job_id}", get(job_status))
        .with_state(state)
}

/// Serves `state` on `bind_address` until `shutdown` turns true
///
/// Background export runs get `drain_timeout` to reach their next batch
/// boundary after the listener closes.
pub async fn serve(
    bind_address: &str,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
    drain_timeout: Duration,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| SyncError::Connection(format!("Failed to bind {bind_address}: {e}")))?;
    let local = listener.local_addr()?;
    tracing::info!(address = %local, "Listening");

    let controller = state.controller.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            tracing::info!("Shutdown requested, closing listener");
        })
        .await?;

    let unfinished = controller.drain(drain_timeout).await;
    tracing::info!(unfinished, "Server stopped");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn bitrix_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let outcome = state.webhooks.handle(content_type, &body).await?;
    Ok(Json(outcome_body(&outcome)))
}

fn outcome_body(outcome: &WebhookOutcome) -> Value {
    match outcome {
        WebhookOutcome::Upserted {
            entity,
            id,
            negotiation,
        } => json!({
            "status": "upserted",
            "entity": entity.as_str(),
            "id": id,
            "negotiation": negotiation,
        }),
        WebhookOutcome::Deleted { entity, id, rows } => json!({
            "status": "deleted",
            "entity": entity.as_str(),
            "id": id,
            "rows": rows,
        }),
        WebhookOutcome::Skipped { entity, id } => json!({
            "status": "skipped",
            "entity": entity.as_str(),
            "id": id,
        }),
        WebhookOutcome::Ignored { name } => json!({
            "status": "ignored",
            "event": name,
        }),
    }
}

async fn job_command(
    State(state): State<AppState>,
    Json(command): Json<JobCommand>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let status = match command {
        JobCommand::Create { .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    let job = state.controller.execute(command).await?;
    Ok((status, Json(job)))
}

async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let job_id = JobId::from_str(&job_id).map_err(SyncError::Validation)?;
    let job = state.ledger.load(job_id).await?;
    Ok(Json(job))
}
