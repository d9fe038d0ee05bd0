//! Session repository
//!
//! Session records live in the TTL key-value store rather than the
//! relational database. Each record is written once at login with a
//! lifetime that ends at the session's `expires_at`, so the store purges
//! it without any sweeper.

use crate::cache::{Cache, CacheLayer};
use crate::models::Session;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Key prefix for session records
const KEY_PREFIX: &str = "session:";

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// No live record for the ID (never written, deleted or expired)
    #[error("session not found")]
    NotFound,

    /// `expires_at` is already in the past
    #[error("session expiry must be in the future")]
    NonPositiveTtl,

    /// The backing store failed
    #[error("session store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Write `session` under `id`, replacing any previous record, with a
    /// lifetime of `session.expires_at - now`
    async fn set(&self, id: Uuid, session: &Session) -> Result<(), SessionStoreError>;

    /// Read the live record for `id`
    async fn get(&self, id: Uuid) -> Result<Session, SessionStoreError>;

    /// Remove the record for `id`; removing a missing record succeeds
    async fn delete(&self, id: Uuid) -> Result<(), SessionStoreError>;
}

/// Session repository over the configured [`Cache`] driver
pub struct CacheSessionRepository {
    cache: Arc<Cache>,
}

impl CacheSessionRepository {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(cache: Arc<Cache>) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(cache))
    }

    fn key(id: Uuid) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }
}

#[async_trait]
impl SessionRepository for CacheSessionRepository {
    async fn set(&self, id: Uuid, session: &Session) -> Result<(), SessionStoreError> {
        let ttl = session
            .remaining_ttl()
            .to_std()
            .ok()
            .filter(|ttl| !ttl.is_zero())
            .ok_or(SessionStoreError::NonPositiveTtl)?;

        self.cache.set(&Self::key(id), session, ttl).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Session, SessionStoreError> {
        self.cache
            .get::<Session>(&Self::key(id))
            .await?
            .ok_or(SessionStoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), SessionStoreError> {
        self.cache.delete(&Self::key(id)).await?;
        Ok(())
    }
}
