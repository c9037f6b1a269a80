//! # hht_auth_api
//!
//! HTTP API library for the HHT diary authentication core.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use hht_auth_core::auth::AuthError;
use hht_auth_core::auth::jwt::TokenService;
use hht_auth_core::auth::keys::TokenKeyPair;
use hht_auth_core::auth::rate_limit::{InMemoryRateLimitStore, RateLimiter};
use hht_auth_core::auth::repository::UserRepository;
use hht_auth_core::clock::Clock;
use hht_auth_core::sponsor::config::SponsorConfigRegistry;
use hht_auth_core::sponsor::resolver::SponsorPatternResolver;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, sponsor};

/// Route paths.
pub mod routes {
    pub const GET_HEALTH: &str = "/health";
    pub const POST_VALIDATE_LINKING_CODE: &str = "/api/v1/auth/linking-code/validate";
    pub const POST_REGISTER: &str = "/api/v1/auth/register";
    pub const POST_LOGIN: &str = "/api/v1/auth/login";
    pub const POST_REFRESH: &str = "/api/v1/auth/refresh";
    pub const POST_CHANGE_PASSWORD: &str = "/api/v1/auth/change-password";
    pub const GET_SPONSOR_CONFIG: &str = "/api/v1/sponsors/{sponsor_id}/config";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub users: Arc<dyn UserRepository>,
    pub sponsors: Arc<SponsorPatternResolver>,
    pub sponsor_configs: Arc<SponsorConfigRegistry>,
    pub tokens: Arc<TokenService>,
    pub limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the token service and rate limiter from `config`.
    pub fn new(
        config: ApiConfig,
        users: Arc<dyn UserRepository>,
        sponsors: SponsorPatternResolver,
        sponsor_configs: SponsorConfigRegistry,
        keys: &TokenKeyPair,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let tokens = TokenService::new(keys, config.token_lifetime, clock.clone())?;
        let limiter = RateLimiter::new(
            InMemoryRateLimitStore::new(),
            config.rate_limit_max_attempts,
            config.rate_limit_window,
            clock.clone(),
        );
        Ok(Self {
            config,
            users,
            sponsors: Arc::new(sponsors),
            sponsor_configs: Arc::new(sponsor_configs),
            tokens: Arc::new(tokens),
            limiter: Arc::new(limiter),
            clock,
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(
            routes::POST_VALIDATE_LINKING_CODE,
            post(auth::validate_linking_code_handler),
        )
        .route(routes::POST_REGISTER, post(auth::register_handler))
        .route(routes::POST_LOGIN, post(auth::login_handler))
        .route(routes::POST_REFRESH, post(auth::refresh_handler))
        .route(
            routes::GET_SPONSOR_CONFIG,
            get(sponsor::sponsor_config_handler),
        );

    // Protected routes (require a valid session token)
    let protected = Router::new()
        .route(
            routes::POST_CHANGE_PASSWORD,
            post(auth::change_password_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
