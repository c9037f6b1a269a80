//! Sponsor (tenant) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default session timeout when a sponsor has no configuration.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u32 = 15;

/// Default inactivity warning lead time.
pub const DEFAULT_INACTIVITY_WARNING_SECONDS: u32 = 60;

/// Linking-code prefix → tenant resolution rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorPattern {
    pub pattern_prefix: String,
    #[serde(rename = "sponsorId")]
    pub tenant_id: String,
    #[serde(rename = "sponsorName")]
    pub tenant_name: String,
    pub portal_url: String,
    /// Backing-store project for the tenant's data.
    pub store_project_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub decommissioned_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl SponsorPattern {
    /// Only active, non-decommissioned patterns take part in resolution.
    pub fn is_active(&self) -> bool {
        self.active && self.decommissioned_at.is_none()
    }
}

/// Sponsor branding shown by the diary app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorBranding {
    pub app_title: String,
    pub primary_color: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Default for SponsorBranding {
    fn default() -> Self {
        Self {
            app_title: "HHT Diary".into(),
            primary_color: "#0E7C86".into(),
            logo_url: None,
        }
    }
}

/// Per-sponsor client configuration: branding and timeout policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorConfig {
    pub sponsor_id: String,
    pub name: String,
    #[serde(default)]
    pub portal_url: Option<String>,
    #[serde(default)]
    pub branding: SponsorBranding,
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u32,
    #[serde(default = "default_inactivity_warning")]
    pub inactivity_warning_seconds: u32,
    /// Set when this is the generic fallback rather than a sponsor's own.
    #[serde(default)]
    pub is_default: bool,
}

fn default_session_timeout() -> u32 {
    DEFAULT_SESSION_TIMEOUT_MINUTES
}

fn default_inactivity_warning() -> u32 {
    DEFAULT_INACTIVITY_WARNING_SECONDS
}

impl SponsorConfig {
    /// Generic configuration served when a sponsor's own is unavailable.
    pub fn fallback(sponsor_id: &str) -> Self {
        Self {
            sponsor_id: sponsor_id.to_string(),
            name: "HHT Diary".into(),
            portal_url: None,
            branding: SponsorBranding::default(),
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            inactivity_warning_seconds: DEFAULT_INACTIVITY_WARNING_SECONDS,
            is_default: true,
        }
    }
}
