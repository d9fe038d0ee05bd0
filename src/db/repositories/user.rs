//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateUserInput, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; a duplicate username or email surfaces as a unique
    /// violation (see [`crate::db::is_unique_violation`])
    async fn create(&self, input: &CreateUserInput) -> Result<User>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_column_sqlite(self.pool.sqlite()?, "username", username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_column_mysql(self.pool.mysql()?, "username", username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_column_sqlite(self.pool.sqlite()?, "email", email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_column_mysql(self.pool.mysql()?, "email", email).await
            }
        }
    }
}

fn new_user(input: &CreateUserInput) -> User {
    User {
        username: input.username.clone(),
        hashed_password: input.hashed_password.clone(),
        full_name: input.full_name.clone(),
        email: input.email.clone(),
        password_changed_at: None,
        // MySQL keeps microseconds; truncate so the returned value matches storage.
        created_at: Utc::now().trunc_subsecs(6),
    }
}

// Lookups interpolate a fixed column name, never request input.
const SELECT_USER: &str =
    "SELECT username, hashed_password, full_name, email, password_changed_at, created_at FROM users";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<User> {
    let user = new_user(input);

    sqlx::query(
        r#"
        INSERT INTO users (username, hashed_password, full_name, email, password_changed_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.hashed_password)
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(user.password_changed_at)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user)
}

async fn get_user_by_column_sqlite(
    pool: &SqlitePool,
    column: &str,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE {} = ?", SELECT_USER, column))
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    Ok(row.map(|r| row_to_user_sqlite(&r)))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        username: row.get("username"),
        hashed_password: row.get("hashed_password"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_changed_at: row.get("password_changed_at"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<User> {
    let user = new_user(input);

    sqlx::query(
        r#"
        INSERT INTO users (username, hashed_password, full_name, email, password_changed_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.hashed_password)
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(user.password_changed_at)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user)
}

async fn get_user_by_column_mysql(
    pool: &MySqlPool,
    column: &str,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE {} = ?", SELECT_USER, column))
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    Ok(row.map(|r| row_to_user_mysql(&r)))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        username: row.get("username"),
        hashed_password: row.get("hashed_password"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_changed_at: row.get("password_changed_at"),
        created_at: row.get("created_at"),
    }
}
