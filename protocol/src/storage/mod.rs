//! # Storage Module
//!
//! Addressable key/value persistence for sealed credential records.
//!
//! ## Architecture
//!
//! ```text
//! keystore.rs  KeyStore: master-key wrapping, timeouts, CAS writes
//! db.rs        SledStore: persistent backend on sled
//! memory.rs    MemoryStore: in-process backend on DashMap
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! IdentityService → KeyStore ──seal under master──▶ KvStore (sled | memory)
//!                            ◀──open under master──
//! ```
//!
//! Every value is addressed by `(address, field)`: `@<pubkey>/creds` for
//! records, `~<alias>/owner` for the alias index. Backends store opaque text
//! and never see a byte of plaintext.
//!
//! ## Design Decisions
//!
//! 1. **Compare-and-swap is part of the capability.** `put_if_absent` is
//!    how registration closes the check-then-write race; a backend that
//!    can't do it atomically doesn't get to implement [`KvStore`].
//!
//! 2. **Absent is not an error.** `get` returns `Ok(None)`. Timeouts and
//!    transport failures are errors, and are never confused with absence.

pub mod db;
pub mod keystore;
pub mod memory;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::crypto::EnvelopeError;

pub use db::SledStore;
pub use keystore::{Ack, KeyStore};
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("value already exists at {address}/{field}")]
    AlreadyExists { address: String, field: String },

    #[error("stored value could not be opened: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("stored value is not valid UTF-8")]
    Corrupt,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The distributed key/value capability the core consumes.
///
/// Implementations must be safe to share across tasks. Reads may be
/// eventually consistent; `put_if_absent` must be atomic per `(address, field)`.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Raw value at `(address, field)`, or `None` when absent.
    async fn get(&self, address: &str, field: &str) -> StoreResult<Option<String>>;

    /// Unconditional write. Resolves once the backend acknowledges.
    async fn put(&self, address: &str, field: &str, value: String) -> StoreResult<()>;

    /// Write only if nothing is stored yet. `Ok(false)` when occupied.
    async fn put_if_absent(&self, address: &str, field: &str, value: String)
        -> StoreResult<bool>;

    /// Delete the value, if any.
    async fn remove(&self, address: &str, field: &str) -> StoreResult<()>;
}

/// Flat key for backends without a native two-level keyspace.
pub(crate) fn flat_key(address: &str, field: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(address.len() + field.len() + 1);
    key.extend_from_slice(address.as_bytes());
    key.push(crate::config::KEY_SEPARATOR);
    key.extend_from_slice(field.as_bytes());
    key
}

/// Run a synchronous backend call on tokio's blocking pool.
///
/// The returned future yields while `op` runs, so a `tokio::time::timeout`
/// around it can fire even when the disk underneath has stalled.
pub(crate) async fn run_blocking<T, F>(op: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking store task failed: {e}")))?
}
