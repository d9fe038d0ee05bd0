//! API middleware
//!
//! Contains:
//! - `AppState`, the shared handles every handler sees
//! - `ApiError`, the `{"error": "..."}` response body
//! - `require_auth`, the bearer-token guard
//! - `AuthPayload` and `ClientMeta` extractors

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        ConnectInfo, FromRequest, FromRequestParts, Request, State,
    },
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::db::repositories::{SessionRepository, SessionStoreError};
use crate::db::DynDatabasePool;
use crate::services::token::{Payload, TokenError, TokenMaker};
use crate::services::{ArticleService, ArticleServiceError, UserService, UserServiceError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub token_maker: Arc<TokenMaker>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// Wire form of [`ApiError`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Log the cause and answer with a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            // Same answer for both so usernames cannot be enumerated.
            UserServiceError::UserNotFound | UserServiceError::InvalidCredentials => {
                ApiError::unauthorized("invalid username or password")
            }
            UserServiceError::SessionNotFound
            | UserServiceError::SessionBlocked
            | UserServiceError::RefreshTokenMismatch
            | UserServiceError::SessionUserMismatch
            | UserServiceError::Token(TokenError::InvalidToken)
            | UserServiceError::Token(TokenError::Expired) => ApiError::unauthorized(err.to_string()),
            UserServiceError::Token(e) => ApiError::internal_error(e),
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            ArticleServiceError::Forbidden(_) => ApiError::forbidden(err.to_string()),
            ArticleServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

// ============================================================================
// Request extractors
// ============================================================================

/// `Json` whose rejection renders as an [`ApiError`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection renders as an [`ApiError`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection renders as an [`ApiError`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Reasons the auth guard turns a request away
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is not provided")]
    MissingHeader,

    #[error("invalid authorization header format")]
    MalformedHeader,

    #[error("unsupported authorization type {0}")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("session not found")]
    SessionNotFound,

    #[error("session is blocked")]
    SessionBlocked,

    #[error("session does not belong to the token's user")]
    SessionMismatch,

    #[error("session store unavailable: {0}")]
    SessionStore(SessionStoreError),
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::NotFound => Self::SessionNotFound,
            other => Self::SessionStore(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SessionStore(e) => ApiError::internal_error(e),
            other => {
                tracing::debug!(reason = %other, "Request rejected by auth guard");
                ApiError::unauthorized(other.to_string())
            }
        }
    }
}

// ============================================================================
// Auth guard
// ============================================================================

/// Pull the bearer credential out of the `Authorization` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;
    // A zero-length header counts as not provided.
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let mut fields = value.split_whitespace();
    let (scheme, token) = match (fields.next(), fields.next()) {
        (Some(scheme), Some(token)) => (scheme, token),
        _ => return Err(AuthError::MalformedHeader),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::UnsupportedScheme(scheme.to_lowercase()));
    }

    Ok(token)
}

/// Run every guard check against the request headers
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Payload, AuthError> {
    let token = extract_bearer_token(headers)?;
    let payload = state.token_maker.verify_token(token)?;

    let session = state.session_repo.get(payload.id).await?;
    if session.is_blocked {
        return Err(AuthError::SessionBlocked);
    }
    if session.username != payload.username {
        return Err(AuthError::SessionMismatch);
    }

    Ok(payload)
}

/// Authentication middleware
///
/// On success the verified token payload rides along in the request
/// extensions as an [`AuthPayload`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let payload = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(AuthPayload(payload));
    Ok(next.run(request).await)
}

/// Identity of the caller, placed by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthPayload(pub Payload);

impl<S> FromRequestParts<S> for AuthPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthPayload>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }
}

// ============================================================================
// Client metadata
// ============================================================================

/// User agent and client IP of the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub user_agent: String,
    pub client_ip: String,
}

impl ClientMeta {
    fn from_parts(parts: &Parts) -> Self {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let user_agent = header_str(header::USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string();

        let forwarded = header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let client_ip = forwarded
            .or_else(|| header_str("x-real-ip"))
            .map(str::to_string)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_default();

        Self {
            user_agent,
            client_ip,
        }
    }
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request as HttpRequest};
    use std::net::{IpAddr, Ipv4Addr};

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(authorization).unwrap(),
        );
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(&headers("BEARER abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(&headers("bearer   abc")).unwrap(), "abc");
    }

    #[test]
    fn test_extract_bearer_token_rejections() {
        assert!(matches!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Bearer")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("")),
            Err(AuthError::MissingHeader)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("   ")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::UnsupportedScheme(s)) if s == "basic"
        ));
    }

    #[test]
    fn test_auth_error_status() {
        let cases = [
            AuthError::MissingHeader,
            AuthError::MalformedHeader,
            AuthError::UnsupportedScheme("basic".to_string()),
            AuthError::Token(TokenError::Expired),
            AuthError::SessionNotFound,
            AuthError::SessionBlocked,
            AuthError::SessionMismatch,
        ];
        for err in cases {
            assert_eq!(ApiError::from(err).status, StatusCode::UNAUTHORIZED);
        }

        let store = AuthError::from(SessionStoreError::NonPositiveTtl);
        assert_eq!(ApiError::from(store).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_login_failures_share_one_message() {
        let unknown = ApiError::from(UserServiceError::UserNotFound);
        let wrong = ApiError::from(UserServiceError::InvalidCredentials);
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.message, wrong.message);
    }

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_client_meta_prefers_forwarded_for() {
        let mut parts = parts(
            HttpRequest::builder()
                .header(header::USER_AGENT, "curl/8.0")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("x-real-ip", "198.51.100.2"),
        );
        parts.extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            4000,
        )));

        let meta = ClientMeta::from_parts(&parts);
        assert_eq!(meta.user_agent, "curl/8.0");
        assert_eq!(meta.client_ip, "203.0.113.9");
    }

    #[test]
    fn test_client_meta_fallbacks() {
        let real_ip = parts(HttpRequest::builder().header("x-real-ip", "198.51.100.2"));
        assert_eq!(ClientMeta::from_parts(&real_ip).client_ip, "198.51.100.2");

        let mut peer = parts(HttpRequest::builder());
        peer.extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            4000,
        )));
        assert_eq!(ClientMeta::from_parts(&peer).client_ip, "192.0.2.1");

        assert_eq!(ClientMeta::from_parts(&parts(HttpRequest::builder())), ClientMeta::default());
    }
}
