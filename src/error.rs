use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the HTTP surface.
///
/// Each kind maps to exactly one status code. Messages on Validation are
/// specific and caller-actionable; ServiceUnavailable and Internal carry a
/// server-side detail that is logged but never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    #[error("sentiment analysis service is temporarily unavailable, please try again later")]
    ServiceUnavailable(String),

    #[error("the requested resource was not found")]
    NotFound,

    #[error("an unexpected error occurred")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal(detail.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire label reported in the `error` field of the response body
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::RateLimited { .. } => "rate_limit_exceeded",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::NotFound => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
            }
            ApiError::ServiceUnavailable(detail) => {
                tracing::warn!(detail = %detail, "sentiment service unavailable");
            }
            _ => {}
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            timestamp: Utc::now(),
        };

        let mut response = (self.status_code(), Json(body)).into_response();

        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::RateLimited {
                retry_after_secs: 60
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::ServiceUnavailable("init failed".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_does_not_leak_detail() {
        let err = ApiError::internal("database password rejected");
        assert_eq!(err.to_string(), "an unexpected error occurred");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ApiError::NotFound.kind(), "not_found");
        assert_eq!(ApiError::validation("x").kind(), "validation_error");
    }
}
