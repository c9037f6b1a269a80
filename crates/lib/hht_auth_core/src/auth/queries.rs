//! Postgres-backed user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::AuthError;
use super::lockout::LockoutPolicy;
use super::repository::UserRepository;
use crate::models::auth::UserRecord;

const USER_COLUMNS: &str = "id::text AS id, username, password_hash, salt, tenant_id, \
     linking_code, app_uuid, created_at, last_login_at, failed_attempts, locked_until";

impl<'r> FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let failed_attempts: i32 = row.try_get("failed_attempts")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            salt: row.try_get("salt")?,
            tenant_id: row.try_get("tenant_id")?,
            linking_code: row.try_get("linking_code")?,
            app_uuid: row.try_get("app_uuid")?,
            created_at: row.try_get("created_at")?,
            last_login_at: row.try_get("last_login_at")?,
            failed_attempts: u32::try_from(failed_attempts).unwrap_or(0),
            locked_until: row.try_get("locked_until")?,
        })
    }
}

/// User repository on the `app_users` table.
///
/// Counter updates are single `UPDATE … RETURNING` statements, so the
/// increment-and-lock is atomic at the database.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn not_found(id: &str) -> AuthError {
    AuthError::NotFound(format!("user {id}"))
}

fn map_insert_error(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return AuthError::DuplicateUsername;
    }
    AuthError::DbError(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "INSERT INTO app_users (id, username, password_hash, salt, tenant_id, linking_code, \
             app_uuid, created_at, last_login_at, failed_attempts, locked_until) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.salt)
            .bind(&user.tenant_id)
            .bind(&user.linking_code)
            .bind(&user.app_uuid)
            .bind(user.created_at)
            .bind(user.last_login_at)
            .bind(i32::try_from(user.failed_attempts).unwrap_or(i32::MAX))
            .bind(user.locked_until)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn get_user_by_username(
        &self,
        username: &str,
        tenant_id: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM app_users WHERE username = $1 AND tenant_id = $2");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM app_users WHERE id = $1::uuid");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn increment_failed_attempts(
        &self,
        id: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET failed_attempts = failed_attempts + 1, \
             locked_until = CASE WHEN failed_attempts + 1 >= $2 THEN $3 ELSE locked_until END \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .bind(i32::try_from(policy.threshold).unwrap_or(i32::MAX))
            .bind(now + policy.duration)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn reset_failed_attempts(&self, id: &str) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET failed_attempts = 0, locked_until = NULL \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn record_successful_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET failed_attempts = 0, locked_until = NULL, last_login_at = $2 \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn lock_account(
        &self,
        id: &str,
        until: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET locked_until = $2 WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .bind(until)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn update_app_uuid(&self, id: &str, app_uuid: &str) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET app_uuid = $2 WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .bind(app_uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET password_hash = $2, salt = $3 \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .bind(password_hash)
            .bind(salt)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn update_user(&self, user: UserRecord) -> Result<UserRecord, AuthError> {
        let sql = format!(
            "UPDATE app_users SET password_hash = $2, salt = $3, linking_code = $4, \
             app_uuid = $5, last_login_at = $6 \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&user.id)
            .bind(&user.password_hash)
            .bind(&user.salt)
            .bind(&user.linking_code)
            .bind(&user.app_uuid)
            .bind(user.last_login_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(&user.id))
    }
}
