//! Token codec
//!
//! Access and refresh tokens are HS256-signed JWTs carrying a [`Payload`].
//! Both kinds are minted by the same [`TokenMaker`] and differ only in the
//! lifetime requested at creation.
//!
//! Verification order is fixed: signature and algorithm first, expiry
//! second. A token whose header names any algorithm other than HS256 is
//! rejected before its claims are looked at.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::config::MIN_SYMMETRIC_KEY_SIZE;

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Session ID the token is bound to
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    fn new(session_id: Uuid, username: &str, duration: Duration) -> Result<Self, TokenError> {
        let issued_at = Utc::now();
        let expired_at = issued_at
            .checked_add_signed(duration)
            .ok_or(TokenError::DurationOutOfRange)?;
        Ok(Self {
            id: session_id,
            username: username.to_string(),
            issued_at,
            expired_at,
        })
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expired_at <= Utc::now()
    }
}

/// Token codec errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid key size: must be at least {MIN_SYMMETRIC_KEY_SIZE} bytes")]
    InvalidKeySize,

    /// Malformed token, bad signature or unexpected algorithm
    #[error("token is invalid")]
    InvalidToken,

    #[error("token has expired")]
    Expired,

    #[error("token lifetime is out of range")]
    DurationOutOfRange,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Mints and verifies tokens with one process-wide signing key
#[derive(Clone)]
pub struct TokenMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMaker").finish_non_exhaustive()
    }
}

impl TokenMaker {
    /// Build a maker from the shared secret
    ///
    /// # Errors
    /// `InvalidKeySize` if the secret is shorter than
    /// [`MIN_SYMMETRIC_KEY_SIZE`] bytes.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.len() < MIN_SYMMETRIC_KEY_SIZE {
            return Err(TokenError::InvalidKeySize);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in `expired_at` and is checked after the signature.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Mint a token for `username` bound to `session_id`, valid for `duration`
    pub fn create_token(
        &self,
        session_id: Uuid,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(session_id, username, duration)?;

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok((token, payload))
    }

    /// Verify a token and return its payload
    ///
    /// # Errors
    /// - `InvalidToken` if the token cannot be parsed, the signature does
    ///   not match, or the header algorithm is not HS256
    /// - `Expired` if the signature is good but `expired_at` has passed
    pub fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let data = decode::<Payload>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            TokenError::InvalidToken
        })?;

        if data.claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
