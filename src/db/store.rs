use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::warn;

use crate::db::models::KvRow;
use crate::error::Result;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        key        TEXT PRIMARY KEY,
        version    INTEGER NOT NULL,
        data       TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// Versioned JSON documents in SQLite, one row per storage key.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// `None` when the key is absent or was written with another `version`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str, version: i64) -> Result<Option<T>> {
        let row: Option<KvRow> =
            sqlx::query_as("SELECT key, version, data, updated_at FROM kv_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else { return Ok(None) };
        if row.version != version {
            warn!(
                key = %row.key,
                stored = row.version,
                expected = version,
                updated_at = row.updated_at,
                "Ignoring stored document with unexpected version"
            );
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&row.data)?))
    }

    pub async fn save<T: Serialize>(&self, key: &str, version: i64, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, version, data, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                version = excluded.version,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(version)
        .bind(data)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
