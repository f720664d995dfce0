//! Database initialization
//!
//! Opens (creating if needed) the catalog database and ensures the schema
//! exists. Schema creation is idempotent and runs on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Connection pool tuning
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path, settings: PoolSettings) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go through connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(settings.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory catalog database
///
/// Each SQLite in-memory connection is its own database, so the pool is
/// pinned to a single connection that is never recycled.
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create catalog tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_groups_table(pool).await?;
    create_songs_table(pool).await?;
    debug!("Catalog schema ready (groups, songs)");
    Ok(())
}

async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    // group_key holds fold_key(group_name); uniqueness and lookups use it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_name TEXT NOT NULL,
            group_key TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES groups(id),
            song_name TEXT NOT NULL,
            song_key TEXT NOT NULL,
            release_date TEXT,
            text TEXT,
            text_key TEXT,
            link TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_group_id ON songs(group_id)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fold_key;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_schema() {
        let pool = init_in_memory_database().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('groups', 'songs') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["groups".to_string(), "songs".to_string()]);
    }

    #[tokio::test]
    async fn test_group_key_is_unique() {
        let pool = init_in_memory_database().await.unwrap();

        sqlx::query("INSERT INTO groups (group_name, group_key) VALUES ('Ärzte', ?)")
            .bind(fold_key("Ärzte"))
            .execute(&pool)
            .await
            .unwrap();

        let dup = sqlx::query("INSERT INTO groups (group_name, group_key) VALUES ('ÄRZTE', ?)")
            .bind(fold_key("ÄRZTE"))
            .execute(&pool)
            .await;
        assert!(dup.is_err(), "case variant must violate the unique constraint");
    }

    #[tokio::test]
    async fn test_song_requires_existing_group() {
        let pool = init_in_memory_database().await.unwrap();

        let orphan = sqlx::query(
            "INSERT INTO songs (group_id, song_name, song_key) VALUES (42, 'Nowhere', 'nowhere')",
        )
        .execute(&pool)
        .await;
        assert!(orphan.is_err(), "foreign key must be enforced");
    }

    #[tokio::test]
    async fn test_file_database_reopen_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("library.db");

        let pool = init_database(&db_path, PoolSettings::default()).await.unwrap();
        sqlx::query("INSERT INTO groups (group_name, group_key) VALUES ('Muse', 'muse')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let pool = init_database(&db_path, PoolSettings::default()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
