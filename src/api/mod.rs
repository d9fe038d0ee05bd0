//! API layer - HTTP handlers and routing
//!
//! Everything is served under `/api/v1`:
//! - User endpoints (register, login, logout)
//! - Token renewal
//! - Article endpoints
//! - Health check

pub mod articles;
pub mod middleware;
pub mod tokens;
pub mod users;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;

pub use middleware::{ApiError, AppState, AuthError, AuthPayload, ClientMeta};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a live session)
    let protected_routes = Router::new()
        .merge(users::protected_router())
        .merge(articles::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/health", get(health))
        .merge(users::public_router())
        .merge(tokens::router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
    let origin = if config.cors_origin == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", config.cors_origin))?,
        )
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// GET /api/v1/health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "ok".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    database: "unreachable".to_string(),
                }),
            )
        }
    }
}
