// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema helpers shared by repository implementations.
//!
//! Applies migrations on start-up so integration tests and services see a
//! consistent database.

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided SQLite pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Ensuring database schema is up to date");
    sqlx::migrate!("../migrations").run(pool).await?;
    info!("Database schema is up to date");
    Ok(())
}

/// Creates a new SQLite database file if it doesn't exist.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!("Database does not exist, creating: {database_url}");
        sqlx::Sqlite::create_database(database_url).await?;
        info!("Created new SQLite database: {database_url}");
    }
    Ok(())
}

/// Creates the database if missing, connects, and migrates.
///
/// An in-memory database gets a single-connection pool: each `:memory:`
/// connection is otherwise its own empty database.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    initialize_database_sized(database_url, 1, 10).await
}

/// `initialize_database` with explicit pool bounds. Each acquisition is
/// scoped to one unit of work; transactions never span connections.
pub async fn initialize_database_sized(
    database_url: &str,
    min_connections: u32,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    create_database_if_missing(database_url).await?;

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?
    } else {
        SqlitePoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?
    };

    ensure_schema(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_create_database_if_missing() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        // Idempotent when the file already exists.
        create_database_if_missing(&db_url).await.unwrap();
        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn test_initialize_database_creates_tables() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='documents'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);

        let fts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE name='documents_fts'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(fts, 1);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        let pool1 = initialize_database(&db_url).await.unwrap();
        drop(pool1);
        let pool2 = initialize_database(&db_url).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(&pool2)
            .await
            .unwrap();
        assert!(applied >= 2, "both migrations should be recorded");
        let _ = std::fs::remove_file(&db_path);
    }
}
