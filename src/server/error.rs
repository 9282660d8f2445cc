use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::query::QueryError;
use crate::providers::FetchError;
use crate::retrieval::RetrievalError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid query parameter")]
    InvalidQuery(#[from] QueryError),
    #[error("Invalid identifier")]
    InvalidId(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Configuration(String),
    #[error("Upstream API error")]
    Upstream { status: u16, body: String },
    #[error("Upstream API unavailable")]
    Unavailable(String),
    #[error("Internal server error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::MissingWorkspace => {
                ApiError::Configuration("CLICKUP_TEAM_ID is not configured".to_string())
            }
            RetrievalError::Fetch(FetchError::Upstream { status, body }) => {
                ApiError::Upstream { status, body }
            }
            RetrievalError::Fetch(e @ FetchError::Transport(_)) => ApiError::Unavailable(e.to_string()),
            RetrievalError::Fetch(e @ FetchError::Decode(_)) => ApiError::Unavailable(e.to_string()),
            RetrievalError::Fetch(e @ FetchError::InvalidId(_)) => ApiError::InvalidId(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery(_) | ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Configuration(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::InvalidQuery(e) => Some(Value::String(e.to_string())),
            // Forward the upstream body as JSON when it is JSON.
            ApiError::Upstream { body, .. } => Some(
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone())),
            ),
            ApiError::InvalidId(msg) | ApiError::Unavailable(msg) | ApiError::Internal(msg) => {
                Some(Value::String(msg.clone()))
            }
            ApiError::Unauthorized | ApiError::Configuration(_) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, details = ?self.details(), "Request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}
