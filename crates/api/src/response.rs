//! Standardized API responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use engine_core::error::ValidationErrorCode;
use serde::{Deserialize, Serialize};
use telemetry::HealthReport;
use tracing::error;

/// Success response for ingestion.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub saved_count: u64,
    pub total_requested: u64,
}

impl From<analytics::IngestOutcome> for IngestResponse {
    fn from(outcome: analytics::IngestOutcome) -> Self {
        Self {
            success: true,
            saved_count: outcome.saved_count,
            total_requested: outcome.total_requested,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: HealthReport,
    pub store_backend: &'static str,
    pub version: &'static str,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with coded error responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::BAD_REQUEST,
            ValidationErrorCode::InvalidFormat.code(),
            msg,
        )
    }

    pub fn rate_limited(code: impl Into<String>, msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(msg, code),
            retry_after,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_001", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
            retry_after: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.response = self.response.with_details(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        if let Some(retry_after) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, retry_after.into());
        }

        response
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<engine_core::Error> for ApiError {
    fn from(err: engine_core::Error) -> Self {
        use engine_core::Error;

        match err {
            Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(code, vec![message])
            }
            Error::Store {
                code,
                message,
                http_status,
            } => {
                error!(code, error = %message, "Request failed in event store");
                ApiError::with_code(status(http_status), code, "event store unavailable")
                    .with_details(vec![message])
            }
            Error::RateLimit {
                code,
                message,
                retry_after,
                ..
            } => ApiError::rate_limited(code, message, retry_after),
            Error::Validation(msg) | Error::MalformedRecord(msg) => ApiError::bad_request(msg),
            Error::Serialization(e) => ApiError::bad_request(e.to_string()),
            Error::Internal(msg) => {
                error!(error = %msg, "Internal error");
                ApiError::internal("internal error")
            }
        }
    }
}
