//! # SledStore: Persistent Backend
//!
//! The on-disk [`KvStore`], built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree        | Key                        | Value                 |
//! |-------------|----------------------------|-----------------------|
//! | `documents` | `address 0x00 field`       | sealed text (UTF-8)   |
//!
//! One tree is enough: addresses carry their own prefix (`@` for records,
//! `~` for the alias index), and the NUL separator keeps `(address, field)`
//! pairs from colliding.
//!
//! ## Atomicity
//!
//! `put_if_absent` is sled's `compare_and_swap` from `None`. Two writers
//! racing for the same key: exactly one wins, the other sees the current
//! value and backs off.
//!
//! ## Blocking
//!
//! sled calls and the `flush` after every write are synchronous. Each one
//! runs on tokio's blocking pool, so a stalled disk never pins a runtime
//! worker and the caller's timeout still fires.

use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;

use super::{flat_key, run_blocking, KvStore, StoreError, StoreResult};
use crate::config::DOCUMENTS_TREE;

/// Persistent storage backend.
///
/// sled is inherently thread-safe, so `SledStore` can be shared across
/// tasks via `Arc<SledStore>` without external synchronization.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    documents: Tree,
}

impl SledStore {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that lives in a temp directory and disappears on drop.
    ///
    /// Ideal for unit tests: no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self { db, documents })
    }

    /// Number of stored `(address, field)` entries.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Force a flush of all pending writes to disk.
    ///
    /// sled buffers writes in memory for performance. This call blocks
    /// until all data is durable on the underlying storage device.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SledStore {
    async fn get(&self, address: &str, field: &str) -> StoreResult<Option<String>> {
        let documents = self.documents.clone();
        let key = flat_key(address, field);
        run_blocking(move || match documents.get(key)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| StoreError::Corrupt)?;
                Ok(Some(text))
            }
            None => Ok(None),
        })
        .await
    }

    async fn put(&self, address: &str, field: &str, value: String) -> StoreResult<()> {
        let store = self.clone();
        let key = flat_key(address, field);
        run_blocking(move || {
            store.documents.insert(key, value.into_bytes())?;
            store.flush()
        })
        .await
    }

    async fn put_if_absent(
        &self,
        address: &str,
        field: &str,
        value: String,
    ) -> StoreResult<bool> {
        let store = self.clone();
        let key = flat_key(address, field);
        run_blocking(move || {
            let outcome =
                store
                    .documents
                    .compare_and_swap(key, None::<&[u8]>, Some(value.into_bytes()))?;
            match outcome {
                Ok(()) => {
                    store.flush()?;
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        })
        .await
    }

    async fn remove(&self, address: &str, field: &str) -> StoreResult<()> {
        let store = self.clone();
        let key = flat_key(address, field);
        run_blocking(move || {
            store.documents.remove(key)?;
            store.flush()
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
