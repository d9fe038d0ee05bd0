//! Article model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article written by a single author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Username of the owner
    pub author: String,
    pub headline: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Last update, `None` until the article is edited
    pub edited_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Whether `username` owns this article
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.author == username
    }
}

/// Input for creating a new article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub author: String,
    pub headline: String,
    pub content: String,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    pub headline: Option<String>,
    pub content: Option<String>,
}

impl UpdateArticleInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.headline.is_some() || self.content.is_some()
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl ListParams {
    pub const MIN_PER_PAGE: u32 = 5;
    pub const MAX_PER_PAGE: u32 = 10;

    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Whether the page index and size are inside the accepted bounds
    pub fn is_valid(&self) -> bool {
        self.page >= 1 && (Self::MIN_PER_PAGE..=Self::MAX_PER_PAGE).contains(&self.per_page)
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}
