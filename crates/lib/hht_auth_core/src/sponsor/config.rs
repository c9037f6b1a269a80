//! Sponsor branding / timeout configuration with a non-fatal fallback.

use std::collections::HashMap;

use tracing::warn;

use crate::auth::AuthError;
use crate::models::sponsor::SponsorConfig;

/// Per-sponsor configuration keyed by sponsor id.
#[derive(Debug, Clone, Default)]
pub struct SponsorConfigRegistry {
    configs: HashMap<String, SponsorConfig>,
}

impl SponsorConfigRegistry {
    pub fn new(configs: impl IntoIterator<Item = SponsorConfig>) -> Self {
        Self {
            configs: configs
                .into_iter()
                .map(|c| (c.sponsor_id.clone(), c))
                .collect(),
        }
    }

    /// The sponsor's own configuration.
    pub fn lookup(&self, sponsor_id: &str) -> Result<SponsorConfig, AuthError> {
        self.configs
            .get(sponsor_id)
            .cloned()
            .ok_or_else(|| AuthError::SponsorConfigUnavailable(sponsor_id.to_string()))
    }

    /// The sponsor's configuration, or the generic fallback if it has none.
    pub fn config_or_default(&self, sponsor_id: &str) -> SponsorConfig {
        self.lookup(sponsor_id).unwrap_or_else(|e| {
            warn!(sponsor_id, error = %e, "serving fallback sponsor config");
            SponsorConfig::fallback(sponsor_id)
        })
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SponsorConfigRegistry {
        let mut cure = SponsorConfig::fallback("curehht");
        cure.name = "Cure HHT".into();
        cure.session_timeout_minutes = 30;
        cure.is_default = false;
        SponsorConfigRegistry::new([cure])
    }

    #[test]
    fn known_sponsor_gets_its_config() {
        let c = registry().config_or_default("curehht");
        assert_eq!(c.name, "Cure HHT");
        assert_eq!(c.session_timeout_minutes, 30);
        assert!(!c.is_default);
    }

    #[test]
    fn unknown_sponsor_lookup_is_unavailable() {
        let err = registry().lookup("nobody").unwrap_err();
        assert!(matches!(err, AuthError::SponsorConfigUnavailable(id) if id == "nobody"));
    }

    #[test]
    fn unknown_sponsor_degrades_to_fallback() {
        let c = registry().config_or_default("nobody");
        assert!(c.is_default);
        assert_eq!(c.sponsor_id, "nobody");
    }
}
