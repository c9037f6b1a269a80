//! Authentication request handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, bearer_token};
use crate::middleware::client_ip::ClientIp;
use crate::models::{
    ChangePasswordRequest, LinkingCodeRequest, LinkingCodeResponse, LoginRequest,
    RegisterRequest, TokenResponse,
};
use crate::services::auth;

/// `POST /api/v1/auth/linking-code/validate` - resolve a code to its sponsor.
pub async fn validate_linking_code_handler(
    State(state): State<AppState>,
    Json(body): Json<LinkingCodeRequest>,
) -> AppResult<Json<LinkingCodeResponse>> {
    let resp = auth::validate_linking_code(&state, &body.linking_code).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/register` - create an account and sign in.
pub async fn register_handler(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(&state, ip.as_str(), &body).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/login` - authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(&state, ip.as_str(), &body).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/refresh` - exchange the Bearer token for a fresh one.
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<TokenResponse>> {
    let token = bearer_token(&headers)?;
    let resp = auth::refresh(&state, token).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/change-password` - requires authentication.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    ip: ClientIp,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::change_password(&state, ip.as_str(), &claims, &body).await?;
    Ok(Json(resp))
}
