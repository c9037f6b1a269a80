//! Sponsor pattern queries.

use sqlx::PgPool;

use super::SponsorError;
use super::resolver::{SponsorPatternResolver, normalize_code};
use crate::models::sponsor::SponsorPattern;

type PatternRow = (
    String,
    String,
    String,
    String,
    String,
    bool,
    chrono::DateTime<chrono::Utc>,
    Option<chrono::DateTime<chrono::Utc>>,
);

/// Fetch every sponsor pattern, including decommissioned ones.
pub async fn load_sponsor_patterns(pool: &PgPool) -> Result<Vec<SponsorPattern>, SponsorError> {
    let rows = sqlx::query_as::<_, PatternRow>(
        "SELECT pattern_prefix, tenant_id, tenant_name, portal_url, store_project_id, \
         active, created_at, decommissioned_at FROM sponsor_patterns",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(
            |(
                pattern_prefix,
                tenant_id,
                tenant_name,
                portal_url,
                store_project_id,
                active,
                created_at,
                decommissioned_at,
            )| SponsorPattern {
                pattern_prefix,
                tenant_id,
                tenant_name,
                portal_url,
                store_project_id,
                active,
                created_at,
                decommissioned_at,
            },
        )
        .collect())
}

/// Build a resolver from the `sponsor_patterns` table.
pub async fn load_resolver(pool: &PgPool) -> Result<SponsorPatternResolver, SponsorError> {
    SponsorPatternResolver::new(load_sponsor_patterns(pool).await?)
}

/// Insert a new active pattern.
///
/// The prefix is stored normalised, the same form the resolver matches on.
pub async fn insert_sponsor_pattern(
    pool: &PgPool,
    pattern: &SponsorPattern,
) -> Result<(), SponsorError> {
    let prefix = normalize_code(&pattern.pattern_prefix);
    sqlx::query(
        "INSERT INTO sponsor_patterns (pattern_prefix, tenant_id, tenant_name, portal_url, \
         store_project_id, active, created_at, decommissioned_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&prefix)
    .bind(&pattern.tenant_id)
    .bind(&pattern.tenant_name)
    .bind(&pattern.portal_url)
    .bind(&pattern.store_project_id)
    .bind(pattern.active)
    .bind(pattern.created_at)
    .bind(pattern.decommissioned_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db) = &e
            && db.is_unique_violation()
        {
            return SponsorError::DuplicatePrefix(prefix.clone());
        }
        SponsorError::DbError(e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    const PREFIX_INDEX: &str =
        include_str!("../../migrations/0002_case_insensitive_sponsor_prefix.sql");

    #[test]
    fn active_prefix_index_ignores_case() {
        assert!(PREFIX_INDEX.contains("ON sponsor_patterns (upper(pattern_prefix))"));
        assert!(PREFIX_INDEX.contains("WHERE active AND decommissioned_at IS NULL"));
    }
}
