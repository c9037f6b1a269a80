//! Sponsor lookups for the public endpoints.

use hht_auth_core::models::sponsor::SponsorConfig;

use crate::AppState;

/// Branding and timeout configuration for `sponsor_id`.
///
/// Never fails: a sponsor with no configuration of its own, known or not,
/// gets the generic fallback.
pub fn sponsor_config(state: &AppState, sponsor_id: &str) -> SponsorConfig {
    let mut config = state.sponsor_configs.config_or_default(sponsor_id);
    if config.portal_url.is_none()
        && let Some(pattern) = state.sponsors.find_by_tenant_id(sponsor_id)
    {
        config.portal_url = Some(pattern.portal_url.clone());
    }
    config
}
