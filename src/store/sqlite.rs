/// SQLite-backed key-value store
use crate::{
    error::ClientResult,
    store::KvStore,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::debug;

/// Connection options
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            enable_wal: true,
        }
    }
}

/// Durable store kept in a single `kv_store` table
#[derive(Clone)]
pub struct SqliteKvStore {
    db: SqlitePool,
}

impl SqliteKvStore {
    /// Open (creating if missing) the database file at `path`
    pub async fn open(path: &Path, options: StoreOptions) -> ClientResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let db = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(if options.enable_wal {
                        SqliteJournalMode::Wal
                    } else {
                        SqliteJournalMode::Delete
                    })
                    .busy_timeout(std::time::Duration::from_secs(5)),
            )
            .await?;

        debug!("Opened key-value store at {}", path.display());
        Self::from_pool(db).await
    }

    /// Wrap an existing pool, creating the table if needed
    pub async fn from_pool(db: SqlitePool) -> ClientResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
