//! Repositories
//!
//! One trait per entity plus its production implementation. Users and
//! articles go to the relational database; sessions go to the TTL store.

pub mod article;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use session::{CacheSessionRepository, SessionRepository, SessionStoreError};
pub use user::{SqlxUserRepository, UserRepository};
