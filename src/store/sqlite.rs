use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use super::ContentStore;

/// Local content store keyed by the SHA-256 of the stored bytes.
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn content_handle(record: &[u8]) -> String {
        hex::encode(Sha256::digest(record))
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn put(&self, record: &[u8]) -> Result<String> {
        let handle = Self::content_handle(record);

        // same bytes, same handle: a second put is a no-op
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO records (handle, body, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&handle)
        .bind(record)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .context("failed to insert record")?;

        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT body FROM records WHERE handle = ?")
            .bind(handle)
            .fetch_optional(&self.db)
            .await
            .context("failed to read record")?;

        Ok(row.map(|r| r.get("body")))
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let store = SqliteStore::new(memory_pool().await);

        let handle = store.put(b"{\"battleId\":\"b1\"}").await.unwrap();
        assert_eq!(handle.len(), 64);
        assert_eq!(store.get(&handle).await.unwrap(), Some(b"{\"battleId\":\"b1\"}".to_vec()));
    }

    #[tokio::test]
    async fn handle_is_content_address_and_put_is_idempotent() {
        let store = SqliteStore::new(memory_pool().await);

        let first = store.put(b"same").await.unwrap();
        let second = store.put(b"same").await.unwrap();
        let other = store.put(b"different").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first, hex::encode(Sha256::digest(b"same")));
    }

    #[tokio::test]
    async fn unknown_handle_is_none() {
        let store = SqliteStore::new(memory_pool().await);
        assert!(store.get("feedface").await.unwrap().is_none());
    }
}
