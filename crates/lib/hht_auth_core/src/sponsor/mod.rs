//! Sponsor (tenant) resolution and per-sponsor client configuration.

pub mod catalog;
pub mod config;
pub mod queries;
pub mod resolver;

use thiserror::Error;

/// Sponsor catalog errors, raised when patterns are loaded or registered.
#[derive(Debug, Error)]
pub enum SponsorError {
    #[error("Duplicate active pattern prefix: {0}")]
    DuplicatePrefix(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Catalog load error: {0}")]
    Load(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}
