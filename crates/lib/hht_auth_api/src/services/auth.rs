//! Registration, login, refresh and password change flows over
//! `hht_auth_core`.
//!
//! Argon2id runs on the blocking pool. Rate limits are checked before any
//! hashing work, and an unknown username still pays for one dummy hash so
//! both failure paths take comparable time.

use hht_auth_core::auth::AuthError;
use hht_auth_core::auth::lockout::AuthStatus;
use hht_auth_core::auth::password::{self, HashParams};
use hht_auth_core::auth::rate_limit::rate_limit_key;
use hht_auth_core::models::auth::{SessionClaims, SessionIdentity, UserRecord};
use hht_auth_core::models::sponsor::SponsorPattern;
use hht_auth_core::sponsor::resolver::normalize_code;
use hht_auth_core::uuid::new_id;
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    ChangePasswordRequest, LinkingCodeResponse, LoginRequest, RegisterRequest, TokenResponse,
};
use crate::services::validation;

/// Run CPU-heavy work off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal(format!("blocking task failed: {e}")))?
}

async fn hash(password: &str, salt: &str, params: HashParams) -> Result<String, AuthError> {
    let password = password.to_string();
    let salt = salt.to_string();
    run_blocking(move || password::hash_password(&password, &salt, &params)).await
}

async fn verify(password: &str, user: &UserRecord, params: HashParams) -> Result<bool, AuthError> {
    let password = password.to_string();
    let salt = user.salt.clone();
    let expected = user.password_hash.clone();
    run_blocking(move || password::verify_password(&password, &salt, &expected, &params)).await
}

async fn burn_dummy_hash(password: &str, params: HashParams) -> Result<(), AuthError> {
    let password = password.to_string();
    run_blocking(move || password::verify_against_dummy(&password, &params)).await
}

/// Record an attempt against `key`, or fail with the time until a slot frees.
fn ensure_allowed(state: &AppState, key: &str) -> Result<(), AuthError> {
    if state.limiter.check_limit(key) {
        return Ok(());
    }
    let retry_after = state.limiter.time_until_reset(key).unwrap_or_default();
    warn!(key, retry_after_secs = retry_after.as_secs(), "rate limit exceeded");
    Err(AuthError::RateLimitExceeded { retry_after })
}

fn resolve_sponsor<'a>(state: &'a AppState, code: &str) -> Result<&'a SponsorPattern, AuthError> {
    state
        .sponsors
        .find_by_linking_code(code)
        .ok_or(AuthError::InvalidLinkingCode)
}

fn issue(state: &AppState, user: UserRecord, tenant_url: &str) -> AppResult<TokenResponse> {
    let issued = state
        .tokens
        .generate_token(&SessionIdentity::for_user(&user, tenant_url))?;
    Ok(TokenResponse::new(issued, user))
}

/// Count a failed password check, reporting the lock if this one set it.
async fn fail_attempt(state: &AppState, user: &UserRecord) -> AuthError {
    let now = state.clock.now();
    match state
        .users
        .increment_failed_attempts(&user.id, &state.config.lockout, now)
        .await
    {
        Ok(updated) => match AuthStatus::of(&updated, now) {
            AuthStatus::Locked { until } => {
                warn!(user_id = %user.id, %until, "account locked after repeated failures");
                AuthError::AccountLocked { until }
            }
            AuthStatus::Unlocked { attempts } => {
                info!(user_id = %user.id, attempts, "password verification failed");
                AuthError::InvalidCredentials
            }
        },
        Err(e) => e,
    }
}

/// Resolve a linking code to its sponsor without creating anything.
pub async fn validate_linking_code(state: &AppState, code: &str) -> AppResult<LinkingCodeResponse> {
    validation::linking_code(code)?;
    let sponsor = resolve_sponsor(state, code)?;
    Ok(LinkingCodeResponse {
        valid: true,
        sponsor_id: sponsor.tenant_id.clone(),
        sponsor_name: sponsor.tenant_name.clone(),
        portal_url: sponsor.portal_url.clone(),
    })
}

/// Create an account in the sponsor the linking code resolves to.
pub async fn register(
    state: &AppState,
    client_ip: &str,
    req: &RegisterRequest,
) -> AppResult<TokenResponse> {
    let username = validation::username(&req.username)?;
    validation::new_password(&req.password)?;
    validation::linking_code(&req.linking_code)?;
    validation::app_uuid(&req.app_uuid)?;

    ensure_allowed(state, &rate_limit_key("register", &[client_ip]))?;

    let sponsor = resolve_sponsor(state, &req.linking_code)?;
    if state
        .users
        .get_user_by_username(&username, &sponsor.tenant_id)
        .await?
        .is_some()
    {
        return Err(AuthError::DuplicateUsername.into());
    }

    let salt = password::generate_salt();
    let password_hash = hash(&req.password, &salt, state.config.hash_params).await?;
    let now = state.clock.now();
    let user = UserRecord {
        id: new_id(),
        username,
        password_hash,
        salt,
        tenant_id: sponsor.tenant_id.clone(),
        linking_code: normalize_code(&req.linking_code),
        app_uuid: req.app_uuid.trim().to_string(),
        created_at: now,
        last_login_at: Some(now),
        failed_attempts: 0,
        locked_until: None,
    };
    let user = state.users.create_user(user).await?;
    info!(user_id = %user.id, tenant_id = %user.tenant_id, "user registered");

    issue(state, user, &sponsor.portal_url)
}

/// Verify credentials within the linking code's sponsor and issue a token.
pub async fn login(
    state: &AppState,
    client_ip: &str,
    req: &LoginRequest,
) -> AppResult<TokenResponse> {
    let username = validation::username(&req.username)?;
    validation::presented_password(&req.password)?;
    validation::linking_code(&req.linking_code)?;

    let key = rate_limit_key("login", &[client_ip, &username]);
    ensure_allowed(state, &key)?;

    let sponsor = resolve_sponsor(state, &req.linking_code)?;
    let params = state.config.hash_params;

    let Some(user) = state
        .users
        .get_user_by_username(&username, &sponsor.tenant_id)
        .await?
    else {
        burn_dummy_hash(&req.password, params).await?;
        info!(tenant_id = %sponsor.tenant_id, "login for unknown username");
        return Err(AuthError::InvalidCredentials.into());
    };

    if let AuthStatus::Locked { until } = AuthStatus::of(&user, state.clock.now()) {
        info!(user_id = %user.id, %until, "login rejected, account locked");
        return Err(AuthError::AccountLocked { until }.into());
    }

    if !verify(&req.password, &user, params).await? {
        return Err(fail_attempt(state, &user).await.into());
    }

    let mut user = state
        .users
        .record_successful_login(&user.id, state.clock.now())
        .await?;
    if let Some(app_uuid) = req.app_uuid.as_deref().map(str::trim)
        && !app_uuid.is_empty()
        && app_uuid != user.app_uuid
    {
        validation::app_uuid(app_uuid)?;
        user = state.users.update_app_uuid(&user.id, app_uuid).await?;
    }
    state.limiter.reset(&key);
    info!(user_id = %user.id, "login succeeded");

    issue(state, user, &sponsor.portal_url)
}

/// Exchange a still-valid token for one with a later expiry.
pub async fn refresh(state: &AppState, token: &str) -> AppResult<TokenResponse> {
    let issued = state
        .tokens
        .refresh_token(token)?
        .ok_or(AuthError::TokenInvalidOrExpired)?;
    let user = state
        .users
        .get_user_by_id(&issued.claims.sub)
        .await?
        .ok_or(AuthError::TokenInvalidOrExpired)?;
    Ok(TokenResponse::new(issued, user))
}

/// Replace the caller's password after re-verifying the current one.
pub async fn change_password(
    state: &AppState,
    client_ip: &str,
    claims: &SessionClaims,
    req: &ChangePasswordRequest,
) -> AppResult<TokenResponse> {
    validation::presented_password(&req.current_password)?;
    validation::new_password(&req.new_password)?;

    let key = rate_limit_key("change-password", &[client_ip, &claims.sub]);
    ensure_allowed(state, &key)?;

    let user = state
        .users
        .get_user_by_id(&claims.sub)
        .await?
        .ok_or(AuthError::TokenInvalidOrExpired)?;

    if let AuthStatus::Locked { until } = AuthStatus::of(&user, state.clock.now()) {
        return Err(AuthError::AccountLocked { until }.into());
    }

    let params = state.config.hash_params;
    if !verify(&req.current_password, &user, params).await? {
        return Err(fail_attempt(state, &user).await.into());
    }
    if req.new_password == req.current_password {
        return Err(AppError::Validation(
            "New password must differ from the current one".into(),
        ));
    }

    let salt = password::generate_salt();
    let password_hash = hash(&req.new_password, &salt, params).await?;
    let user = state
        .users
        .update_password(&user.id, &password_hash, &salt)
        .await?;
    state.limiter.reset(&key);
    info!(user_id = %user.id, "password changed");

    issue(state, user, &claims.tenant_url)
}
