//! Authentication domain models.
//!
//! Field names on the wire are camelCase and must stay stable: the diary
//! app and the sponsor portal both read these payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One registered principal within one sponsor tenant.
///
/// `password_hash` and `salt` are always base64 strings, never raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    /// Unique per tenant, not globally.
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    #[serde(rename = "sponsorId")]
    pub tenant_id: String,
    pub linking_code: String,
    /// Device / app instance that registered the account.
    pub app_uuid: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Whether the lock is still in force at `now`.
    ///
    /// An expired `locked_until` counts as unlocked without any write.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// The identity half of a session token: everything except the times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// User record id.
    pub sub: String,
    pub username: String,
    pub tenant_id: String,
    /// Sponsor portal base URL.
    pub tenant_url: String,
    pub app_uuid: String,
}

impl SessionIdentity {
    /// Build the identity for `user`, bound to the tenant's portal URL.
    pub fn for_user(user: &UserRecord, tenant_url: &str) -> Self {
        Self {
            sub: user.id.clone(),
            username: user.username.clone(),
            tenant_id: user.tenant_id.clone(),
            tenant_url: tenant_url.to_string(),
            app_uuid: user.app_uuid.clone(),
        }
    }
}

/// Signed session token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Subject: the user record id (standard JWT `sub` claim).
    pub sub: String,
    pub username: String,
    #[serde(rename = "sponsorId")]
    pub tenant_id: String,
    #[serde(rename = "sponsorUrl")]
    pub tenant_url: String,
    pub app_uuid: String,
    /// Issued at (unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (unix timestamp, seconds).
    pub exp: i64,
}

impl SessionClaims {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            sub: self.sub.clone(),
            username: self.username.clone(),
            tenant_id: self.tenant_id.clone(),
            tenant_url: self.tenant_url.clone(),
            app_uuid: self.app_uuid.clone(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
