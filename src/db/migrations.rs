//! Embedded schema migrations
//!
//! Migrations are SQL strings compiled into the binary, one variant per
//! backend, applied in version order and recorded in `_migrations`.

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique, ascending
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                username VARCHAR(64) PRIMARY KEY,
                hashed_password VARCHAR(255) NOT NULL,
                full_name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_changed_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                username VARCHAR(64) PRIMARY KEY,
                hashed_password VARCHAR(255) NOT NULL,
                full_name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_changed_at TIMESTAMP(6) NULL,
                created_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;
        "#,
    },
    Migration {
        version: 2,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author VARCHAR(64) NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                headline VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                edited_at TIMESTAMP NULL
            );
            CREATE INDEX IF NOT EXISTS idx_articles_author ON articles(author);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                author VARCHAR(64) NOT NULL,
                headline VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                edited_at TIMESTAMP(6) NULL,
                INDEX idx_articles_author (author),
                CONSTRAINT fk_articles_author FOREIGN KEY (author)
                    REFERENCES users(username) ON DELETE CASCADE
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;
        "#,
    },
];

/// Apply every migration not yet recorded; returns how many ran
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        match pool.driver() {
            DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
            DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
        }
        .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .count())
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i32>> {
    const SQL: &str = "SELECT version FROM _migrations ORDER BY version";

    let versions = match pool.driver() {
        DatabaseDriver::Sqlite => sqlx::query(SQL)
            .fetch_all(pool.sqlite()?)
            .await?
            .iter()
            .map(|row| row.get::<i64, _>("version") as i32)
            .collect(),
        DatabaseDriver::Mysql => sqlx::query(SQL)
            .fetch_all(pool.mysql()?)
            .await?
            .iter()
            .map(|row| row.get::<i32, _>("version"))
            .collect(),
    };

    Ok(versions)
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

// MySQL DDL commits implicitly, so no transaction here.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;
    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split a migration body on `;`, dropping empty and comment-only pieces
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| {
            stmt.lines()
                .map(str::trim)
                .any(|line| !line.is_empty() && !line.starts_with("--"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[test]
    fn test_versions_are_unique_and_ascending() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n-- comment only\n;\nCREATE INDEX i ON a(id);  ";
        let statements = split_sql_statements(sql);
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (id INT)", "CREATE INDEX i ON a(id)"]
        );
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.unwrap();

        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&pool).await.unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&pool).await.unwrap(), 0);
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_articles_reference_users() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let sqlite = pool.sqlite().unwrap();

        let orphan = sqlx::query(
            "INSERT INTO articles (author, headline, content) VALUES ('nobody', 'h', 'c')",
        )
        .execute(sqlite)
        .await;
        assert!(orphan.is_err());

        sqlx::query(
            "INSERT INTO users (username, hashed_password, full_name, email) VALUES ('alice', 'x', 'Alice', 'alice@example.com')",
        )
        .execute(sqlite)
        .await
        .unwrap();
        sqlx::query("INSERT INTO articles (author, headline, content) VALUES ('alice', 'h', 'c')")
            .execute(sqlite)
            .await
            .unwrap();
    }
}
