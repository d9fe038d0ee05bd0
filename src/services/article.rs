//! Article service
//!
//! Article CRUD on behalf of an authenticated user. Reads by ID are open to
//! any signed-in user; listing is scoped to the caller; update and delete
//! require the caller to be the author.

use crate::db::repositories::ArticleRepository;
use crate::models::{Article, CreateArticleInput, ListParams, UpdateArticleInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    /// The caller is not the article's author
    #[error("Article {0} does not belong to the authenticated user")]
    Forbidden(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service for managing a user's articles
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// Create an article authored by `author`
    pub async fn create(
        &self,
        author: &str,
        headline: String,
        content: String,
    ) -> Result<Article, ArticleServiceError> {
        validate_text("headline", &headline)?;
        validate_text("content", &content)?;

        let article = self
            .repo
            .create(&CreateArticleInput {
                author: author.to_string(),
                headline,
                content,
            })
            .await
            .context("Failed to create article")?;

        tracing::info!(id = article.id, author = %article.author, "Article created");
        Ok(article)
    }

    /// Get an article by ID
    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        validate_id(id)?;
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or(ArticleServiceError::NotFound(id))
    }

    /// One page of the caller's own articles
    pub async fn list_for_author(
        &self,
        author: &str,
        params: ListParams,
    ) -> Result<Vec<Article>, ArticleServiceError> {
        if !params.is_valid() {
            return Err(ArticleServiceError::ValidationError(format!(
                "page_id must be at least 1 and page_size between {} and {}",
                ListParams::MIN_PER_PAGE,
                ListParams::MAX_PER_PAGE
            )));
        }

        let articles = self
            .repo
            .list_by_author(author, &params)
            .await
            .context("Failed to list articles")?;
        Ok(articles)
    }

    /// Update headline and/or content of an article the caller owns
    pub async fn update(
        &self,
        caller: &str,
        id: i64,
        input: UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        if !input.has_changes() {
            return Err(ArticleServiceError::ValidationError(
                "nothing to update".to_string(),
            ));
        }
        if let Some(ref headline) = input.headline {
            validate_text("headline", headline)?;
        }
        if let Some(ref content) = input.content {
            validate_text("content", content)?;
        }

        self.owned_article(caller, id).await?;

        let article = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update article")?
            // Deleted between the ownership check and the update.
            .ok_or(ArticleServiceError::NotFound(id))?;

        tracing::info!(id, author = %caller, "Article updated");
        Ok(article)
    }

    /// Delete an article the caller owns
    pub async fn delete(&self, caller: &str, id: i64) -> Result<(), ArticleServiceError> {
        self.owned_article(caller, id).await?;

        let removed = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete article")?;
        if !removed {
            return Err(ArticleServiceError::NotFound(id));
        }

        tracing::info!(id, author = %caller, "Article deleted");
        Ok(())
    }

    /// Fetch `id` and require `caller` to be its author
    async fn owned_article(&self, caller: &str, id: i64) -> Result<Article, ArticleServiceError> {
        let article = self.get(id).await?;
        if !article.is_owned_by(caller) {
            tracing::debug!(id, caller, author = %article.author, "Ownership check failed");
            return Err(ArticleServiceError::Forbidden(id));
        }
        Ok(article)
    }
}

fn validate_id(id: i64) -> Result<(), ArticleServiceError> {
    if id < 1 {
        return Err(ArticleServiceError::ValidationError(
            "article id must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> Result<(), ArticleServiceError> {
    if value.trim().is_empty() {
        return Err(ArticleServiceError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::MockArticleRepository;
    use super::*;
    use std::sync::atomic::Ordering;

    fn service(repo: Arc<MockArticleRepository>) -> ArticleService {
        ArticleService::new(repo)
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let service = service(Arc::new(MockArticleRepository::default()));

        let article = service
            .create("alice", "Hello".to_string(), "World".to_string())
            .await
            .unwrap();
        assert_eq!(article.author, "alice");

        let empty = service
            .create("alice", "  ".to_string(), "World".to_string())
            .await;
        assert!(matches!(empty, Err(ArticleServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = service(Arc::new(MockArticleRepository::default()));
        let result = service.get(2137).await;
        assert!(matches!(result, Err(ArticleServiceError::NotFound(2137))));
    }

    #[tokio::test]
    async fn test_get_rejects_non_positive_id() {
        let service = service(Arc::new(MockArticleRepository::default()));
        assert!(matches!(
            service.get(0).await,
            Err(ArticleServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_foreign_article_is_forbidden() {
        let repo = MockArticleRepository::with_article(1, "bob");
        let service = service(repo.clone());

        let result = service.delete("alice", 1).await;

        assert!(matches!(result, Err(ArticleServiceError::Forbidden(1))));
        assert_eq!(repo.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_update_foreign_article_is_forbidden() {
        let repo = MockArticleRepository::with_article(1, "bob");
        let service = service(repo.clone());

        let input = UpdateArticleInput {
            headline: Some("Mine now".to_string()),
            content: None,
        };
        let result = service.update("alice", 1, input).await;

        assert!(matches!(result, Err(ArticleServiceError::Forbidden(1))));
        assert_eq!(repo.update_count(), 0);
    }

    #[tokio::test]
    async fn test_ownership_lookup_failure_is_internal() {
        let repo = MockArticleRepository::with_article(1, "alice");
        repo.fail_reads.store(true, Ordering::SeqCst);
        let service = service(repo.clone());

        let result = service.delete("alice", 1).await;

        assert!(matches!(result, Err(ArticleServiceError::InternalError(_))));
        assert_eq!(repo.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_owner_can_update_and_delete() {
        let repo = MockArticleRepository::with_article(1, "alice");
        let service = service(repo.clone());

        let updated = service
            .update(
                "alice",
                1,
                UpdateArticleInput {
                    headline: None,
                    content: Some("Edited".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.headline, "Seeded");
        assert_eq!(updated.content, "Edited");
        assert!(updated.edited_at.is_some());

        service.delete("alice", 1).await.unwrap();
        assert_eq!(repo.delete_count(), 1);
        assert!(matches!(
            service.get(1).await,
            Err(ArticleServiceError::NotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_update_without_changes_is_rejected() {
        let repo = MockArticleRepository::with_article(1, "alice");
        let service = service(repo.clone());

        let result = service.update("alice", 1, UpdateArticleInput::default()).await;
        assert!(matches!(result, Err(ArticleServiceError::ValidationError(_))));
        assert_eq!(repo.update_count(), 0);
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_paginated() {
        let repo = Arc::new(MockArticleRepository::default());
        let service = service(repo);
        for i in 0..7 {
            service
                .create("alice", format!("A{}", i), "c".to_string())
                .await
                .unwrap();
        }
        service
            .create("bob", "B".to_string(), "c".to_string())
            .await
            .unwrap();

        let first = service
            .list_for_author("alice", ListParams::new(1, 5))
            .await
            .unwrap();
        let second = service
            .list_for_author("alice", ListParams::new(2, 5))
            .await
            .unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 2);
        assert!(first.iter().chain(&second).all(|a| a.author == "alice"));

        let bad = service.list_for_author("alice", ListParams::new(1, 11)).await;
        assert!(matches!(bad, Err(ArticleServiceError::ValidationError(_))));
    }
}
