//! User API endpoints
//!
//! - POST /api/v1/users - Register
//! - POST /api/v1/users/login - Open a session
//! - POST /api/v1/users/logout - Close the caller's session

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthPayload, ClientMeta};
use crate::models::UserProfile;
use crate::services::user::{ClientInfo, LoginInput, RegisterInput};

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: Uuid,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Routes open to anonymous callers
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login))
}

/// Routes behind the auth guard
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/users/logout", post(logout))
}

/// POST /api/v1/users
async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let input = RegisterInput::new(body.username, body.password, body.full_name, body.email);
    let user = state.user_service.create_user(input).await?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// POST /api/v1/users/login
async fn login(
    State(state): State<AppState>,
    client: ClientMeta,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .user_service
        .login(
            LoginInput::new(body.username, body.password),
            ClientInfo {
                user_agent: client.user_agent,
                client_ip: client.client_ip,
            },
        )
        .await?;

    Ok(Json(LoginResponse {
        session_id: outcome.session_id,
        access_token: outcome.access_token,
        access_token_expires_at: outcome.access_payload.expired_at,
        refresh_token: outcome.refresh_token,
        refresh_token_expires_at: outcome.refresh_payload.expired_at,
        user: UserProfile::from(&outcome.user),
    }))
}

/// POST /api/v1/users/logout
async fn logout(
    State(state): State<AppState>,
    AuthPayload(identity): AuthPayload,
) -> Result<StatusCode, ApiError> {
    state.user_service.logout(&identity).await?;
    Ok(StatusCode::NO_CONTENT)
}
