//! HTTP error mapping

use crate::domain::SyncError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A [`SyncError`] on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub SyncError);

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SyncError::Webhook(_) | SyncError::Validation(_) | SyncError::Mapping(_) => {
                StatusCode::BAD_REQUEST
            }
            SyncError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SyncError::JobNotFound(_) => StatusCode::NOT_FOUND,
            SyncError::InvalidTransition { .. } => StatusCode::CONFLICT,
            SyncError::Crm(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
