//! Linking code → sponsor resolution by longest active prefix.

use std::collections::HashSet;

use tracing::debug;

use super::SponsorError;
use crate::models::sponsor::SponsorPattern;

/// Trim and upper-case a linking code or prefix before comparison.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Immutable snapshot of the sponsor pattern table.
///
/// Patterns are held longest-prefix first so the first active match is the
/// most specific one. Two active patterns with the same prefix are rejected
/// when the snapshot is built.
#[derive(Debug, Clone, Default)]
pub struct SponsorPatternResolver {
    patterns: Vec<SponsorPattern>,
}

impl SponsorPatternResolver {
    pub fn new(patterns: Vec<SponsorPattern>) -> Result<Self, SponsorError> {
        let mut resolver = Self::default();
        for pattern in patterns {
            resolver.register(pattern)?;
        }
        Ok(resolver)
    }

    /// Add a pattern, rejecting a second active pattern for one prefix.
    pub fn register(&mut self, mut pattern: SponsorPattern) -> Result<(), SponsorError> {
        pattern.pattern_prefix = normalize_code(&pattern.pattern_prefix);
        if pattern.pattern_prefix.is_empty() {
            return Err(SponsorError::InvalidPattern(format!(
                "empty prefix for sponsor {}",
                pattern.tenant_id
            )));
        }
        if pattern.is_active()
            && self
                .active()
                .any(|p| p.pattern_prefix == pattern.pattern_prefix)
        {
            return Err(SponsorError::DuplicatePrefix(pattern.pattern_prefix));
        }
        let at = self
            .patterns
            .partition_point(|p| p.pattern_prefix.len() >= pattern.pattern_prefix.len());
        self.patterns.insert(at, pattern);
        Ok(())
    }

    fn active(&self) -> impl Iterator<Item = &SponsorPattern> {
        self.patterns.iter().filter(|p| p.is_active())
    }

    /// Most specific active pattern whose prefix starts `code`.
    pub fn find_by_linking_code(&self, code: &str) -> Option<&SponsorPattern> {
        let code = normalize_code(code);
        let found = self
            .active()
            .find(|p| code.starts_with(p.pattern_prefix.as_str()));
        if found.is_none() {
            debug!("no sponsor pattern matches linking code");
        }
        found
    }

    /// Active pattern for a tenant id.
    pub fn find_by_tenant_id(&self, tenant_id: &str) -> Option<&SponsorPattern> {
        self.active().find(|p| p.tenant_id == tenant_id)
    }

    /// Distinct tenant ids with at least one active pattern.
    pub fn tenant_ids(&self) -> HashSet<&str> {
        self.active().map(|p| p.tenant_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn pattern(prefix: &str, tenant: &str) -> SponsorPattern {
        SponsorPattern {
            pattern_prefix: prefix.into(),
            tenant_id: tenant.into(),
            tenant_name: tenant.to_uppercase(),
            portal_url: format!("https://{tenant}.example"),
            store_project_id: format!("{tenant}-prod"),
            active: true,
            created_at: Utc::now(),
            decommissioned_at: None,
        }
    }

    fn resolver() -> SponsorPatternResolver {
        SponsorPatternResolver::new(vec![pattern("HHT-", "a"), pattern("HHT-CUR-", "b")]).unwrap()
    }

    #[test]
    fn longest_prefix_wins() {
        let r = resolver();
        assert_eq!(r.find_by_linking_code("HHT-CUR-12345").unwrap().tenant_id, "b");
        assert_eq!(r.find_by_linking_code("HHT-OTHER-12345").unwrap().tenant_id, "a");
    }

    #[test]
    fn registration_order_does_not_matter() {
        let r = SponsorPatternResolver::new(vec![pattern("HHT-CUR-", "b"), pattern("HHT-", "a")])
            .unwrap();
        assert_eq!(r.find_by_linking_code("HHT-CUR-1").unwrap().tenant_id, "b");
    }

    #[test]
    fn no_match_is_none() {
        assert!(resolver().find_by_linking_code("XYZ-1").is_none());
        assert!(resolver().find_by_linking_code("").is_none());
    }

    #[test]
    fn decommissioned_patterns_are_skipped() {
        let mut retired = pattern("OLD-", "c");
        retired.decommissioned_at = Some(Utc::now());
        let mut inactive = pattern("OFF-", "d");
        inactive.active = false;
        let r = SponsorPatternResolver::new(vec![retired, inactive]).unwrap();
        assert!(r.find_by_linking_code("OLD-123").is_none());
        assert!(r.find_by_linking_code("OFF-123").is_none());
    }

    #[test]
    fn decommissioned_specific_pattern_falls_back_to_general() {
        let mut retired = pattern("HHT-CUR-", "b");
        retired.active = false;
        let r = SponsorPatternResolver::new(vec![pattern("HHT-", "a"), retired]).unwrap();
        assert_eq!(r.find_by_linking_code("HHT-CUR-1").unwrap().tenant_id, "a");
    }

    #[test]
    fn codes_are_normalized() {
        let r = resolver();
        assert_eq!(r.find_by_linking_code("  hht-cur-9 ").unwrap().tenant_id, "b");
    }

    #[test]
    fn duplicate_active_prefix_is_rejected() {
        let err = SponsorPatternResolver::new(vec![pattern("HHT-", "a"), pattern("hht-", "b")])
            .unwrap_err();
        assert!(matches!(err, SponsorError::DuplicatePrefix(p) if p == "HHT-"));
    }

    #[test]
    fn inactive_duplicate_prefix_is_allowed() {
        let mut old = pattern("HHT-", "old");
        old.active = false;
        let r = SponsorPatternResolver::new(vec![old, pattern("HHT-", "a")]).unwrap();
        assert_eq!(r.find_by_linking_code("HHT-1").unwrap().tenant_id, "a");
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let err = SponsorPatternResolver::new(vec![pattern("  ", "a")]).unwrap_err();
        assert!(matches!(err, SponsorError::InvalidPattern(_)));
    }

    #[test]
    fn find_by_tenant_id_uses_active_patterns() {
        let r = resolver();
        assert_eq!(r.find_by_tenant_id("b").unwrap().pattern_prefix, "HHT-CUR-");
        assert!(r.find_by_tenant_id("zzz").is_none());
        assert_eq!(r.tenant_ids().len(), 2);
    }
}
