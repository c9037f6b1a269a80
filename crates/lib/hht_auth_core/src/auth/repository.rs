//! User record storage.
//!
//! Every read-modify-write (failed-attempt increment with lockout, success
//! reset) happens atomically per record inside the backend, so two
//! concurrent failures for one user always produce two increments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::AuthError;
use super::lockout::{LockoutPolicy, register_success};
use crate::models::auth::UserRecord;

/// Storage operations for user records.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Insert a new record.
    ///
    /// Fails with [`AuthError::DuplicateUsername`] when the username is taken
    /// within the same tenant.
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, AuthError>;

    async fn get_user_by_username(
        &self,
        username: &str,
        tenant_id: &str,
    ) -> Result<Option<UserRecord>, AuthError>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Add one failed attempt, locking the record when the policy threshold
    /// is reached.
    async fn increment_failed_attempts(
        &self,
        id: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError>;

    /// Zero the counter and clear any lock.
    async fn reset_failed_attempts(&self, id: &str) -> Result<UserRecord, AuthError>;

    /// Reset lockout state and stamp the login time.
    async fn record_successful_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError>;

    async fn lock_account(&self, id: &str, until: DateTime<Utc>)
    -> Result<UserRecord, AuthError>;

    /// Set the device identifier only.
    async fn update_app_uuid(&self, id: &str, app_uuid: &str) -> Result<UserRecord, AuthError>;

    /// Set the password hash and salt only. Lockout state is left as is.
    async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<UserRecord, AuthError>;

    /// Replace the stored record's profile and credential fields with
    /// those of `user` (matched by id).
    ///
    /// `failed_attempts` and `locked_until` keep their stored values; they
    /// change only through the counter operations above.
    async fn update_user(&self, user: UserRecord) -> Result<UserRecord, AuthError>;
}

fn not_found(id: &str) -> AuthError {
    AuthError::NotFound(format!("user {id}"))
}

/// Per-process user store.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, UserRecord>,
    /// (tenant_id, username) → id
    usernames: DashMap<(String, String), String>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify(
        &self,
        id: &str,
        f: impl FnOnce(&mut UserRecord),
    ) -> Result<UserRecord, AuthError> {
        let mut user = self.users.get_mut(id).ok_or_else(|| not_found(id))?;
        f(user.value_mut());
        Ok(user.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, AuthError> {
        let key = (user.tenant_id.clone(), user.username.clone());
        match self.usernames.entry(key) {
            Entry::Occupied(_) => Err(AuthError::DuplicateUsername),
            Entry::Vacant(slot) => {
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                Ok(user)
            }
        }
    }

    async fn get_user_by_username(
        &self,
        username: &str,
        tenant_id: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let key = (tenant_id.to_string(), username.to_string());
        let Some(id) = self.usernames.get(&key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn increment_failed_attempts(
        &self,
        id: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        self.modify(id, |u| policy.register_failure(u, now))
    }

    async fn reset_failed_attempts(&self, id: &str) -> Result<UserRecord, AuthError> {
        self.modify(id, |u| {
            u.failed_attempts = 0;
            u.locked_until = None;
        })
    }

    async fn record_successful_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        self.modify(id, |u| register_success(u, at))
    }

    async fn lock_account(
        &self,
        id: &str,
        until: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        self.modify(id, |u| u.locked_until = Some(until))
    }

    async fn update_app_uuid(&self, id: &str, app_uuid: &str) -> Result<UserRecord, AuthError> {
        self.modify(id, |u| u.app_uuid = app_uuid.to_string())
    }

    async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<UserRecord, AuthError> {
        self.modify(id, |u| {
            u.password_hash = password_hash.to_string();
            u.salt = salt.to_string();
        })
    }

    async fn update_user(&self, user: UserRecord) -> Result<UserRecord, AuthError> {
        let mut stored = self.users.get_mut(&user.id).ok_or_else(|| not_found(&user.id))?;
        if stored.username != user.username || stored.tenant_id != user.tenant_id {
            return Err(AuthError::Validation(
                "username and tenant cannot be changed".into(),
            ));
        }
        let updated = UserRecord {
            failed_attempts: stored.failed_attempts,
            locked_until: stored.locked_until,
            ..user
        };
        *stored = updated.clone();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn record(id: &str, username: &str, tenant: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            username: username.into(),
            password_hash: "aGFzaA==".into(),
            salt: "c2FsdHNhbHRzYWx0c2FsdA==".into(),
            tenant_id: tenant.into(),
            linking_code: "HHT-1".into(),
            app_uuid: "app".into(),
            created_at: Utc::now(),
            last_login_at: None,
            failed_attempts: 0,
            locked_until: None,
        }
    }

    #[tokio::test]
    async fn username_uniqueness_is_per_tenant() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(record("1", "alice", "a")).await.unwrap();
        repo.create_user(record("2", "alice", "b")).await.unwrap();

        let a = repo.get_user_by_username("alice", "a").await.unwrap().unwrap();
        let b = repo.get_user_by_username("alice", "b").await.unwrap().unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");

        let err = repo.create_user(record("3", "alice", "a")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));
        assert!(repo.get_user_by_id("3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_lookups_return_none() {
        let repo = InMemoryUserRepository::new();
        assert!(repo.get_user_by_id("nope").await.unwrap().is_none());
        assert!(
            repo.get_user_by_username("nobody", "a")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn fifth_increment_locks() {
        let repo = InMemoryUserRepository::new();
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let mut user = record("1", "alice", "a");
        user.failed_attempts = 4;
        repo.create_user(user).await.unwrap();

        let updated = repo.increment_failed_attempts("1", &policy, now).await.unwrap();
        assert_eq!(updated.failed_attempts, 5);
        assert_eq!(updated.locked_until, Some(now + Duration::minutes(15)));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryUserRepository::new());
        repo.create_user(record("1", "alice", "a")).await.unwrap();
        let policy = LockoutPolicy {
            threshold: 1000,
            ..LockoutPolicy::default()
        };
        let now = Utc::now();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.increment_failed_attempts("1", &policy, now).await.unwrap();
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        let user = repo.get_user_by_id("1").await.unwrap().unwrap();
        assert_eq!(user.failed_attempts, 50);
    }

    #[tokio::test]
    async fn successful_login_resets_lockout() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        repo.create_user(record("1", "alice", "a")).await.unwrap();
        repo.lock_account("1", now + Duration::minutes(5)).await.unwrap();

        let user = repo.record_successful_login("1", now).await.unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert_eq!(user.locked_until, None);
        assert_eq!(user.last_login_at, Some(now));
    }

    #[tokio::test]
    async fn reset_failed_attempts_clears_lock() {
        let repo = InMemoryUserRepository::new();
        let mut user = record("1", "alice", "a");
        user.failed_attempts = 5;
        user.locked_until = Some(Utc::now() + Duration::minutes(10));
        repo.create_user(user).await.unwrap();

        let user = repo.reset_failed_attempts("1").await.unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert!(user.locked_until.is_none());
    }

    #[tokio::test]
    async fn update_user_replaces_credentials() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create_user(record("1", "alice", "a")).await.unwrap();
        let changed = UserRecord {
            password_hash: "bmV3".into(),
            ..user
        };
        repo.update_user(changed).await.unwrap();
        let stored = repo.get_user_by_id("1").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "bmV3");
    }

    #[tokio::test]
    async fn stale_update_keeps_concurrent_failures() {
        let repo = InMemoryUserRepository::new();
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let snapshot = repo.create_user(record("1", "alice", "a")).await.unwrap();
        repo.increment_failed_attempts("1", &policy, now).await.unwrap();

        let stored = repo
            .update_user(UserRecord {
                app_uuid: "other".into(),
                ..snapshot
            })
            .await
            .unwrap();
        assert_eq!(stored.app_uuid, "other");
        assert_eq!(stored.failed_attempts, 1);
    }

    #[tokio::test]
    async fn targeted_updates_leave_lockout_alone() {
        let repo = InMemoryUserRepository::new();
        let until = Utc::now() + Duration::minutes(15);
        let mut user = record("1", "alice", "a");
        user.failed_attempts = 5;
        user.locked_until = Some(until);
        repo.create_user(user).await.unwrap();

        let user = repo.update_app_uuid("1", "device-2").await.unwrap();
        assert_eq!(user.app_uuid, "device-2");
        let user = repo.update_password("1", "bmV3", "c2FsdA==").await.unwrap();
        assert_eq!(user.password_hash, "bmV3");
        assert_eq!(user.salt, "c2FsdA==");
        assert_eq!(user.failed_attempts, 5);
        assert_eq!(user.locked_until, Some(until));
    }

    #[tokio::test]
    async fn update_user_cannot_move_tenant() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create_user(record("1", "alice", "a")).await.unwrap();
        let moved = UserRecord {
            tenant_id: "b".into(),
            ..user
        };
        assert!(matches!(
            repo.update_user(moved).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn mutating_unknown_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let err = repo.reset_failed_attempts("ghost").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }
}
