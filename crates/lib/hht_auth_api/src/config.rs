//! API server configuration.

use chrono::Duration;
use hht_auth_core::auth::jwt::DEFAULT_TOKEN_LIFETIME_SECS;
use hht_auth_core::auth::lockout::{DEFAULT_LOCKOUT_SECS, DEFAULT_LOCKOUT_THRESHOLD, LockoutPolicy};
use hht_auth_core::auth::password::HashParams;
use hht_auth_core::auth::rate_limit::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_SECS};
use tracing::warn;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// Argon2id parameters; must match the diary app.
    pub hash_params: HashParams,
    pub lockout: LockoutPolicy,
    pub rate_limit_max_attempts: usize,
    pub rate_limit_window: Duration,
    pub token_lifetime: Duration,
    /// Reverse proxies in front of the server whose `X-Forwarded-For`
    /// entries are trusted. Zero keys rate limits on the socket peer.
    pub trusted_proxy_hops: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            hash_params: HashParams::SHARED,
            lockout: LockoutPolicy::default(),
            rate_limit_max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_window: Duration::seconds(DEFAULT_WINDOW_SECS),
            token_lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
            trusted_proxy_hops: 0,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default          |
    /// |---------------------------|------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:3100` |
    /// | `TOKEN_LIFETIME_MINUTES`  | `15`             |
    /// | `RATE_LIMIT_MAX_ATTEMPTS` | `5`              |
    /// | `RATE_LIMIT_WINDOW_SECS`  | `60`             |
    /// | `LOCKOUT_THRESHOLD`       | `5`              |
    /// | `LOCKOUT_MINUTES`         | `15`             |
    /// | `TRUSTED_PROXY_HOPS`      | `0`              |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            hash_params: HashParams::SHARED,
            lockout: LockoutPolicy {
                threshold: env_or("LOCKOUT_THRESHOLD", DEFAULT_LOCKOUT_THRESHOLD),
                duration: Duration::minutes(env_or("LOCKOUT_MINUTES", DEFAULT_LOCKOUT_SECS / 60)),
            },
            rate_limit_max_attempts: env_or("RATE_LIMIT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            rate_limit_window: Duration::seconds(env_or(
                "RATE_LIMIT_WINDOW_SECS",
                DEFAULT_WINDOW_SECS,
            )),
            token_lifetime: Duration::minutes(env_or(
                "TOKEN_LIFETIME_MINUTES",
                DEFAULT_TOKEN_LIFETIME_SECS / 60,
            )),
            trusted_proxy_hops: env_or("TRUSTED_PROXY_HOPS", defaults.trusted_proxy_hops),
        }
    }
}

/// Parse `name` from the environment, falling back to `default` when it is
/// unset or malformed.
fn env_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(name, value = %raw, "ignoring malformed environment value");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_policy() {
        let c = ApiConfig::default();
        assert_eq!(c.hash_params, HashParams::SHARED);
        assert_eq!(c.lockout.threshold, 5);
        assert_eq!(c.lockout.duration, Duration::minutes(15));
        assert_eq!(c.rate_limit_max_attempts, 5);
        assert_eq!(c.rate_limit_window, Duration::seconds(60));
        assert_eq!(c.token_lifetime, Duration::minutes(15));
        assert_eq!(c.trusted_proxy_hops, 0);
    }

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("HHT_AUTH_SURELY_UNSET_VARIABLE", 7u32), 7);
    }
}
