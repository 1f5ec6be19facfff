//! Store trait: the abstract interface for block persistence.
//!
//! The ledger only ever sees opaque values keyed by height. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// The Store trait: async key-value interface keyed by block height.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic puts**: a reader never observes a partially written value.
/// - **Overwrites**: `put` on an existing key replaces the value. The ledger
///   relies on this only for its tamper hook.
/// - **Ordering**: `scan` yields entries in ascending key order.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the value stored at `key`.
    async fn get(&self, key: u64) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`, replacing any previous value.
    async fn put(&self, key: u64, value: &[u8]) -> Result<()>;

    /// Get every entry, ordered by key.
    async fn scan(&self) -> Result<Vec<(u64, Vec<u8>)>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64> {
        Ok(self.scan().await?.len() as u64)
    }

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn put(&self, key: u64, value: &[u8]) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn scan(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        (**self).scan().await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }
}
