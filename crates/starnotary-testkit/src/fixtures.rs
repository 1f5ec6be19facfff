//! Test fixtures and helpers.
//!
//! Common setup code for error-path tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use starnotary_store::{MemoryStore, Result, Store, StoreError};

/// A memory store whose reads and writes can be switched to fail.
///
/// Failures surface as [`StoreError::Io`], the way a broken disk would.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    /// Create a store that works until told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read (`get`, `scan`, `count`) fail or succeed.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write (`put`, `clear`) fail or succeed.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("injected {} failure", op),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.get(key).await
    }

    async fn put(&self, key: u64, value: &[u8]) -> Result<()> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.put(key, value).await
    }

    async fn scan(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.scan().await
    }

    async fn count(&self) -> Result<u64> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.count().await
    }

    async fn clear(&self) -> Result<()> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.clear().await
    }
}
