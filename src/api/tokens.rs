//! Token API endpoints
//!
//! - POST /api/v1/tokens/renew_access - Trade a refresh token for a new access token

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct RenewAccessTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/tokens/renew_access", post(renew_access_token))
}

/// POST /api/v1/tokens/renew_access
async fn renew_access_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RenewAccessTokenRequest>,
) -> Result<Json<RenewAccessTokenResponse>, ApiError> {
    if body.refresh_token.is_empty() {
        return Err(ApiError::validation_error("refresh_token is required"));
    }

    let renewed = state
        .user_service
        .renew_access_token(&body.refresh_token)
        .await?;

    Ok(Json(RenewAccessTokenResponse {
        access_token: renewed.access_token,
        access_token_expires_at: renewed.access_payload.expired_at,
    }))
}
