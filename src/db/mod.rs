//! Database layer
//!
//! Users and articles live in a relational store:
//! - SQLite (default, single-file deployment)
//! - MySQL
//!
//! The driver is selected by configuration; repositories branch on
//! [`DatabasePool::driver`] and run backend-specific SQL.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Whether an error chain bottoms out in a unique-constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        let err = anyhow::anyhow!("plain failure");
        assert!(!is_unique_violation(&err));

        let err = anyhow::Error::new(sqlx::Error::RowNotFound).context("lookup");
        assert!(!is_unique_violation(&err));
    }
}
