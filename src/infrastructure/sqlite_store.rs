use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqlitePoolOptions};

use crate::domain::repository::KeyValueStore;

/// Key-value slots kept in a single SQLite table.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteKeyValueStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = if is_memory_url(database_url) {
            // every connection to `:memory:` is its own database
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open {database_url}"))?;
        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&*self.pool)
        .await
        .context("failed to create kv_store table")?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .with_context(|| format!("failed to read slot {key}"))?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .with_context(|| format!("failed to write slot {key}"))?;
        Ok(())
    }
}

pub fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

/// Creates the database file and its parent directories for `sqlite://` URLs.
pub fn prepare_sqlite_file(database_url: &str) -> Result<()> {
    if is_memory_url(database_url) { return Ok(()); }
    if let Some(path) = database_url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        // On Windows, absolute paths may look like /C:/path; strip the leading slash
        let path = if cfg!(windows) && path.len() >= 3 && path.as_bytes()[0] == b'/' && path.as_bytes()[2] == b':' {
            &path[1..]
        } else {
            path
        };
        use std::{fs, fs::OpenOptions, path::Path};
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        if !p.exists() {
            OpenOptions::new().create(true).append(true).open(p).with_context(|| format!("failed to create {}", p.display()))?;
        }
    }
    Ok(())
}
