//! Article repository
//!
//! Database operations for articles. Ownership is not checked here; the
//! article service fetches the row and compares authors before calling
//! `update` or `delete`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Article, CreateArticleInput, ListParams, UpdateArticleInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, input: &CreateArticleInput) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// One page of `author`'s articles, oldest first
    async fn list_by_author(&self, author: &str, params: &ListParams) -> Result<Vec<Article>>;

    /// Apply the present fields and stamp `edited_at`; `None` if the row is gone
    async fn update(&self, id: i64, input: &UpdateArticleInput) -> Result<Option<Article>>;

    /// Returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, input: &CreateArticleInput) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_article_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_article_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_article_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_article_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list_by_author(&self, author: &str, params: &ListParams) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_articles_sqlite(self.pool.sqlite()?, author, params).await
            }
            DatabaseDriver::Mysql => list_articles_mysql(self.pool.mysql()?, author, params).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateArticleInput) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_article_sqlite(self.pool.sqlite()?, id, input).await
            }
            DatabaseDriver::Mysql => update_article_mysql(self.pool.mysql()?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM articles WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete article")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM articles WHERE id = ?")
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete article")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const SELECT_ARTICLE: &str =
    "SELECT id, author, headline, content, created_at, edited_at FROM articles";

const UPDATE_ARTICLE: &str = r#"
    UPDATE articles
    SET headline = COALESCE(?, headline),
        content = COALESCE(?, content),
        edited_at = ?
    WHERE id = ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, input: &CreateArticleInput) -> Result<Article> {
    let result = sqlx::query(
        "INSERT INTO articles (author, headline, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.author)
    .bind(&input.headline)
    .bind(&input.content)
    .bind(Utc::now().trunc_subsecs(6))
    .execute(pool)
    .await
    .context("Failed to create article")?;

    get_article_sqlite(pool, result.last_insert_rowid())
        .await?
        .context("Article not found after insert")
}

async fn get_article_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ARTICLE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article")?;

    Ok(row.map(|r| row_to_article_sqlite(&r)))
}

async fn list_articles_sqlite(
    pool: &SqlitePool,
    author: &str,
    params: &ListParams,
) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        "{} WHERE author = ? ORDER BY id LIMIT ? OFFSET ?",
        SELECT_ARTICLE
    ))
    .bind(author)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_sqlite).collect())
}

async fn update_article_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdateArticleInput,
) -> Result<Option<Article>> {
    let result = sqlx::query(UPDATE_ARTICLE)
        .bind(&input.headline)
        .bind(&input.content)
        .bind(Utc::now().trunc_subsecs(6))
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update article")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_article_sqlite(pool, id).await
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        author: row.get("author"),
        headline: row.get("headline"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        edited_at: row.get("edited_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, input: &CreateArticleInput) -> Result<Article> {
    let result = sqlx::query(
        "INSERT INTO articles (author, headline, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.author)
    .bind(&input.headline)
    .bind(&input.content)
    .bind(Utc::now().trunc_subsecs(6))
    .execute(pool)
    .await
    .context("Failed to create article")?;

    get_article_mysql(pool, result.last_insert_id() as i64)
        .await?
        .context("Article not found after insert")
}

async fn get_article_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ARTICLE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article")?;

    Ok(row.map(|r| row_to_article_mysql(&r)))
}

async fn list_articles_mysql(
    pool: &MySqlPool,
    author: &str,
    params: &ListParams,
) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        "{} WHERE author = ? ORDER BY id LIMIT ? OFFSET ?",
        SELECT_ARTICLE
    ))
    .bind(author)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_mysql).collect())
}

async fn update_article_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &UpdateArticleInput,
) -> Result<Option<Article>> {
    // MySQL reports matched-but-unchanged rows as 0 affected, so check existence by re-reading.
    sqlx::query(UPDATE_ARTICLE)
        .bind(&input.headline)
        .bind(&input.content)
        .bind(Utc::now().trunc_subsecs(6))
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update article")?;

    get_article_mysql(pool, id).await
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Article {
    Article {
        id: row.get("id"),
        author: row.get("author"),
        headline: row.get("headline"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        edited_at: row.get("edited_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateUserInput;

    async fn setup_test_repo() -> SqlxArticleRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        for name in ["alice", "bob"] {
            users
                .create(&CreateUserInput {
                    username: name.to_string(),
                    hashed_password: "hash".to_string(),
                    full_name: name.to_string(),
                    email: format!("{}@example.com", name),
                })
                .await
                .expect("Failed to create user");
        }

        SqlxArticleRepository::new(pool)
    }

    fn input(author: &str, headline: &str) -> CreateArticleInput {
        CreateArticleInput {
            author: author.to_string(),
            headline: headline.to_string(),
            content: format!("{} body", headline),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;

        let created = repo.create(&input("alice", "First")).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.author, "alice");
        assert_eq!(created.edited_at, None);

        let found = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.get_by_id(2137).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_by_author_filters_and_pages() {
        let repo = setup_test_repo().await;
        for i in 0..7 {
            repo.create(&input("alice", &format!("a{}", i))).await.unwrap();
        }
        repo.create(&input("bob", "b0")).await.unwrap();

        let first = repo
            .list_by_author("alice", &ListParams::new(1, 5))
            .await
            .unwrap();
        let second = repo
            .list_by_author("alice", &ListParams::new(2, 5))
            .await
            .unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 2);
        assert!(first.iter().chain(second.iter()).all(|a| a.author == "alice"));
        assert_eq!(first[0].headline, "a0");
        assert_eq!(second[1].headline, "a6");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_absent_fields() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("alice", "Original")).await.unwrap();

        let updated = repo
            .update(
                created.id,
                &UpdateArticleInput {
                    headline: Some("Renamed".to_string()),
                    content: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.headline, "Renamed");
        assert_eq!(updated.content, created.content);
        assert!(updated.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_is_none() {
        let repo = setup_test_repo().await;
        let result = repo
            .update(99, &UpdateArticleInput::default())
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("alice", "Doomed")).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert_eq!(repo.get_by_id(created.id).await.unwrap(), None);
    }
}
