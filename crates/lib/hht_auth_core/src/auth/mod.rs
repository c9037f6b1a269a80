//! Authentication and authorization logic.
//!
//! Provides the Argon2id password contract, session tokens, sliding-window
//! rate limiting, account lockout and the user repository shared by the
//! HTTP layer and the operator CLI.

pub mod jwt;
pub mod keys;
pub mod lockout;
pub mod password;
pub mod queries;
pub mod rate_limit;
pub mod repository;

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Authentication errors.
///
/// Everything above `Validation` is user-visible; the rest is reported to
/// callers as a generic internal failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid linking code")]
    InvalidLinkingCode,

    #[error("Username already exists")]
    DuplicateUsername,

    /// Covers both unknown username and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Too many attempts, retry in {}s", retry_after.as_secs())]
    RateLimitExceeded { retry_after: Duration },

    #[error("Token invalid or expired")]
    TokenInvalidOrExpired,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid salt length: {0} bytes")]
    InvalidSaltLength(usize),

    #[error("Sponsor config unavailable: {0}")]
    SponsorConfigUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
