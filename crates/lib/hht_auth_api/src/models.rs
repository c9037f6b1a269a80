//! Request and response bodies. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use hht_auth_core::auth::jwt::IssuedToken;
use hht_auth_core::models::auth::UserRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingCodeRequest {
    pub linking_code: String,
}

/// Result of resolving a linking code to its sponsor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingCodeResponse {
    pub valid: bool,
    pub sponsor_id: String,
    pub sponsor_name: String,
    pub portal_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub linking_code: String,
    pub app_uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub linking_code: String,
    #[serde(default)]
    pub app_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Issued session token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Seconds from issuance.
    pub expires_in: i64,
    pub user: UserRecord,
}

impl TokenResponse {
    pub fn new(issued: IssuedToken, user: UserRecord) -> Self {
        Self {
            expires_at: issued.expires_at(),
            expires_in: issued.expires_in(),
            token: issued.token,
            token_type: "Bearer".into(),
            user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
