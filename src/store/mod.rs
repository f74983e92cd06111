//! Content-addressed persistence for settlement records.
//!
//! Handles are opaque to callers: an IPFS CID for [`IpfsStore`], a hex
//! SHA-256 digest for [`SqliteStore`].

pub mod ipfs;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

pub use ipfs::IpfsStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stores `record` and returns the handle it can be read back with.
    async fn put(&self, record: &[u8]) -> Result<String>;

    /// Bytes stored under `handle`, or `None` when nothing is stored there.
    async fn get(&self, handle: &str) -> Result<Option<Vec<u8>>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
