//! Sponsor catalog files.
//!
//! A catalog is a YAML document with the sponsor patterns and the sponsor
//! configs, using the same camelCase keys as the wire format:
//!
//! ```yaml
//! patterns:
//!   - patternPrefix: "HHT-CUR-"
//!     sponsorId: curehht
//!     sponsorName: Cure HHT
//!     portalUrl: https://curehht.example
//!     storeProjectId: curehht-prod
//! configs:
//!   - sponsorId: curehht
//!     name: Cure HHT
//!     sessionTimeoutMinutes: 15
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::SponsorError;
use super::config::SponsorConfigRegistry;
use super::resolver::SponsorPatternResolver;
use crate::models::sponsor::{SponsorConfig, SponsorPattern};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SponsorCatalog {
    #[serde(default)]
    pub patterns: Vec<SponsorPattern>,
    #[serde(default)]
    pub configs: Vec<SponsorConfig>,
}

impl SponsorCatalog {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SponsorError> {
        serde_yaml::from_str(yaml).map_err(|e| SponsorError::Load(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, SponsorError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SponsorError::Load(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Build the resolver and config registry from this catalog.
    pub fn into_parts(
        self,
    ) -> Result<(SponsorPatternResolver, SponsorConfigRegistry), SponsorError> {
        let resolver = SponsorPatternResolver::new(self.patterns)?;
        Ok((resolver, SponsorConfigRegistry::new(self.configs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r##"
patterns:
  - patternPrefix: "HHT-"
    sponsorId: general
    sponsorName: General
    portalUrl: https://general.example
    storeProjectId: general-prod
  - patternPrefix: "HHT-CUR-"
    sponsorId: curehht
    sponsorName: Cure HHT
    portalUrl: https://curehht.example
    storeProjectId: curehht-prod
  - patternPrefix: "OLD-"
    sponsorId: retired
    sponsorName: Retired
    portalUrl: https://retired.example
    storeProjectId: retired-prod
    active: false
configs:
  - sponsorId: curehht
    name: Cure HHT
    sessionTimeoutMinutes: 20
    branding:
      appTitle: Cure HHT Diary
      primaryColor: "#123456"
"##;

    #[test]
    fn parses_and_builds_resolver() {
        let catalog = SponsorCatalog::from_yaml_str(CATALOG).unwrap();
        assert_eq!(catalog.patterns.len(), 3);
        let (resolver, configs) = catalog.into_parts().unwrap();
        assert_eq!(
            resolver.find_by_linking_code("HHT-CUR-1").unwrap().tenant_id,
            "curehht"
        );
        assert!(resolver.find_by_linking_code("OLD-1").is_none());
        assert_eq!(configs.lookup("curehht").unwrap().session_timeout_minutes, 20);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sponsors.yaml");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = SponsorCatalog::load(&path).unwrap();
        assert_eq!(catalog.configs.len(), 1);
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = SponsorCatalog::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, SponsorError::Load(_)));
    }

    #[test]
    fn malformed_yaml_is_load_error() {
        let err = SponsorCatalog::from_yaml_str("patterns: [").unwrap_err();
        assert!(matches!(err, SponsorError::Load(_)));
    }
}
