//! # hht_auth_core
//!
//! Core authentication logic for the HHT diary: password hashing,
//! sponsor (tenant) resolution, rate limiting, account lockout and
//! session tokens.

pub mod auth;
pub mod clock;
pub mod migrate;
pub mod models;
pub mod sponsor;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
