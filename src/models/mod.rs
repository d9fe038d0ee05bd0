//! Data models
//!
//! Entities persisted by the repositories plus the input types the
//! services accept:
//! - User, Article (relational store)
//! - Session (TTL key-value store)

mod article;
mod session;
mod user;

pub use article::{Article, CreateArticleInput, ListParams, UpdateArticleInput};
pub use session::Session;
pub use user::{CreateUserInput, User, UserProfile};
