//! # Star Notary Store
//!
//! Storage abstraction for Star Notary. Provides a trait-based interface
//! for block persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store is a plain ordered key-value map from block height to the
//! block's canonical bytes. It knows nothing about blocks; decoding and
//! integrity checks belong to the ledger.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use starnotary_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("notary.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     store.put(0, b"block bytes").await.unwrap();
//!     assert_eq!(store.count().await.unwrap(), 1);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;
