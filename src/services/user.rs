//! User service
//!
//! Registration plus the session lifecycle:
//! - `login` verifies credentials, mints an access/refresh token pair bound
//!   to a fresh session ID and stores the session record
//! - `logout` deletes the caller's session record
//! - `renew_access_token` trades a refresh token for a new access token
//!   while its session record is live, unblocked and still holds that
//!   exact refresh token
//!
//! Sessions are never extended: renewal leaves the record untouched.

use crate::config::TokenConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, SessionStoreError, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{Payload, TokenError, TokenMaker};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Minimum password length accepted at registration and login
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    /// No user with the supplied username
    #[error("User not found")]
    UserNotFound,

    /// Password did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session is blocked")]
    SessionBlocked,

    /// The presented refresh token is not the one stored with the session
    #[error("Mismatched session token")]
    RefreshTokenMismatch,

    /// The session belongs to a different user than the token claims
    #[error("Incorrect session user")]
    SessionUserMismatch,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<SessionStoreError> for UserServiceError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::NotFound => Self::SessionNotFound,
            other => Self::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Input for registering a user
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            full_name: full_name.into(),
            email: email.into(),
        }
    }

    fn validate(&self) -> Result<(), UserServiceError> {
        validate_credentials(&self.username, &self.password)?;
        if self.full_name.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "full_name cannot be empty".to_string(),
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(UserServiceError::ValidationError(
                "email is not a valid address".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<(), UserServiceError> {
    if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(UserServiceError::ValidationError(
            "username must be non-empty and alphanumeric".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Input for logging in
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), UserServiceError> {
        validate_credentials(&self.username, &self.password)
    }
}

/// Request metadata recorded with a new session
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: String,
    pub client_ip: String,
}

/// Everything a successful login hands back to the caller
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: Uuid,
    pub access_token: String,
    pub access_payload: Payload,
    pub refresh_token: String,
    pub refresh_payload: Payload,
    pub user: User,
}

/// A freshly minted access token
#[derive(Debug, Clone)]
pub struct RenewedAccess {
    pub access_token: String,
    pub access_payload: Payload,
}

/// User service for registration and session lifecycle
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    token_maker: Arc<TokenMaker>,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        token_maker: Arc<TokenMaker>,
        token_config: &TokenConfig,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            token_maker,
            access_token_duration: token_config.access_token_duration(),
            refresh_token_duration: token_config.refresh_token_duration(),
        }
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// - `ValidationError` for malformed input
    /// - `UserExists` if the username or email is taken
    /// - `InternalError` for storage or hashing failures
    pub async fn create_user(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        input.validate()?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "email '{}' is already registered",
                input.email
            )));
        }

        let hashed_password = hash_password(&input.password)?;

        let created = self
            .user_repo
            .create(&CreateUserInput {
                username: input.username,
                hashed_password,
                full_name: input.full_name,
                email: input.email,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(username = %user.username, "User registered");
                Ok(user)
            }
            // Lost a race with a concurrent registration.
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(
                "username or email is already taken".to_string(),
            )),
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }

    /// Verify credentials and open a new session
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the username or password is malformed
    /// - `UserNotFound` / `InvalidCredentials` on bad credentials
    /// - `InternalError` if the session cannot be stored
    pub async fn login(
        &self,
        input: LoginInput,
        client: ClientInfo,
    ) -> Result<LoginOutcome, UserServiceError> {
        input.validate()?;

        let user = self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::UserNotFound)?;

        if !verify_password(&input.password, &user.hashed_password)
            .context("Failed to verify password")?
        {
            tracing::debug!(username = %user.username, "Login rejected: wrong password");
            return Err(UserServiceError::InvalidCredentials);
        }

        let session_id = Uuid::new_v4();
        let (access_token, access_payload) = self.token_maker.create_token(
            session_id,
            &user.username,
            self.access_token_duration,
        )?;
        let (refresh_token, refresh_payload) = self.token_maker.create_token(
            session_id,
            &user.username,
            self.refresh_token_duration,
        )?;

        let session = Session {
            id: session_id,
            username: user.username.clone(),
            refresh_token: refresh_token.clone(),
            created_at: Utc::now(),
            expires_at: refresh_payload.expired_at,
            user_agent: client.user_agent,
            client_ip: client.client_ip,
            is_blocked: false,
        };
        self.session_repo.set(session_id, &session).await?;

        tracing::info!(username = %user.username, %session_id, "Session opened");

        Ok(LoginOutcome {
            session_id,
            access_token,
            access_payload,
            refresh_token,
            refresh_payload,
            user,
        })
    }

    /// Close the caller's session; closing an already closed session succeeds
    pub async fn logout(&self, identity: &Payload) -> Result<(), UserServiceError> {
        self.session_repo.delete(identity.id).await?;
        tracing::info!(username = %identity.username, session_id = %identity.id, "Session closed");
        Ok(())
    }

    /// Mint a new access token from a refresh token
    ///
    /// # Errors
    ///
    /// - `Token` if the refresh token is invalid or expired
    /// - `SessionNotFound` if the session was closed or has expired
    /// - `SessionBlocked`, `RefreshTokenMismatch`, `SessionUserMismatch`
    ///   if the session no longer vouches for this token
    pub async fn renew_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RenewedAccess, UserServiceError> {
        let refresh_payload = self.token_maker.verify_token(refresh_token)?;
        let session = self.session_repo.get(refresh_payload.id).await?;

        if session.is_blocked {
            return Err(UserServiceError::SessionBlocked);
        }
        if session.refresh_token != refresh_token {
            return Err(UserServiceError::RefreshTokenMismatch);
        }
        if session.username != refresh_payload.username {
            return Err(UserServiceError::SessionUserMismatch);
        }

        let (access_token, access_payload) = self.token_maker.create_token(
            refresh_payload.id,
            &refresh_payload.username,
            self.access_token_duration,
        )?;

        tracing::debug!(session_id = %refresh_payload.id, "Access token renewed");

        Ok(RenewedAccess {
            access_token,
            access_payload,
        })
    }
}
