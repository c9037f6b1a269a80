//! Account lockout policy.
//!
//! Each failed password check increments the record's counter by one; on
//! reaching the threshold the record is locked for a fixed duration. An
//! expired lock is unlocked by the passage of time alone, with the counter
//! left at its last value until the next successful login clears it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::auth::UserRecord;

/// Failed attempts before an account locks.
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;

/// Lock duration: 15 minutes.
pub const DEFAULT_LOCKOUT_SECS: i64 = 15 * 60;

/// Threshold and duration for account lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub threshold: u32,
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOCKOUT_THRESHOLD,
            duration: Duration::seconds(DEFAULT_LOCKOUT_SECS),
        }
    }
}

impl LockoutPolicy {
    /// Apply one failed attempt to `user` at `now`.
    ///
    /// Storage backends call this inside their per-record critical section
    /// so concurrent failures never lose an increment.
    pub fn register_failure(&self, user: &mut UserRecord, now: DateTime<Utc>) {
        user.failed_attempts = user.failed_attempts.saturating_add(1);
        if user.failed_attempts >= self.threshold {
            user.locked_until = Some(now + self.duration);
        }
    }
}

/// Authentication status of a user record, computed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AuthStatus {
    Unlocked { attempts: u32 },
    Locked { until: DateTime<Utc> },
}

impl AuthStatus {
    pub fn of(user: &UserRecord, now: DateTime<Utc>) -> Self {
        match user.locked_until {
            Some(until) if until > now => AuthStatus::Locked { until },
            _ => AuthStatus::Unlocked {
                attempts: user.failed_attempts,
            },
        }
    }
}

/// Clear lockout state after a successful login.
pub fn register_success(user: &mut UserRecord, now: DateTime<Utc>) {
    user.failed_attempts = 0;
    user.locked_until = None;
    user.last_login_at = Some(now);
}
