//! Sponsor configuration handler.

use axum::Json;
use axum::extract::{Path, State};
use hht_auth_core::models::sponsor::SponsorConfig;

use crate::AppState;
use crate::services::sponsor;

/// `GET /api/v1/sponsors/{sponsor_id}/config` - branding and timeouts.
pub async fn sponsor_config_handler(
    State(state): State<AppState>,
    Path(sponsor_id): Path<String>,
) -> Json<SponsorConfig> {
    Json(sponsor::sponsor_config(&state, &sponsor_id))
}
