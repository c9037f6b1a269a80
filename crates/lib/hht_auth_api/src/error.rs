//! Application error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use hht_auth_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid linking code")]
    InvalidLinkingCode,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Account locked until {until}")]
    Locked { until: DateTime<Utc> },

    #[error("Too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.clone()),
            AppError::InvalidLinkingCode => {
                (StatusCode::BAD_REQUEST, "invalid_linking_code", message)
            }
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.clone()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.clone()),
            AppError::Locked { .. } => (StatusCode::LOCKED, "account_locked", message),
            AppError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", message)
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let mut body = ErrorResponse {
            error: error.to_string(),
            message,
            locked_until: None,
            retry_after_seconds: None,
        };
        match &self {
            AppError::Locked { until } => body.locked_until = Some(*until),
            AppError::RateLimited { retry_after_secs } => {
                body.retry_after_seconds = Some(*retry_after_secs)
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidLinkingCode => AppError::InvalidLinkingCode,
            AuthError::DuplicateUsername => AppError::Conflict("Username already exists".into()),
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::AccountLocked { until } => AppError::Locked { until },
            AuthError::RateLimitExceeded { retry_after } => {
                // Round up so a client never retries a fraction early.
                let mut secs = retry_after.as_secs();
                if retry_after.subsec_nanos() > 0 {
                    secs += 1;
                }
                AppError::RateLimited {
                    retry_after_secs: secs.max(1),
                }
            }
            AuthError::TokenInvalidOrExpired => {
                AppError::Unauthorized("Invalid or expired token".into())
            }
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::Encoding(_)
            | AuthError::InvalidSaltLength(_)
            | AuthError::SponsorConfigUnavailable(_)
            | AuthError::DbError(_)
            | AuthError::Internal(_) => AppError::Internal(e.to_string()),
        }
    }
}
