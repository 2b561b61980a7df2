//! # KeyStore
//!
//! Addressable put/get over a [`KvStore`], with two guarantees layered on
//! top of the raw capability:
//!
//! 1. **Nothing leaves unsealed.** Every value is sealed under the
//!    [`MasterKeypair`] on the way in, and opened (signature-verified) under
//!    it on the way out. An optional caller keypair adds a second, inner
//!    layer.
//! 2. **Nothing hangs forever.** Every backend call is bounded by
//!    `timeout`; hitting it is [`StoreError::Timeout`], never "not found".
//!
//! No retries happen here. If the caller wants backoff, the caller owns it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{KvStore, StoreError, StoreResult};
use crate::crypto::envelope::{open_text, seal_and_compress, seal_and_sign};
use crate::crypto::keys::{Keypair, MasterKeypair};

/// Acknowledgement of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub address: String,
    pub field: String,
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stored {}/{}", self.address, self.field)
    }
}

/// Master-key-wrapping view over a key/value backend.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct KeyStore {
    backend: Arc<dyn KvStore>,
    master: Arc<MasterKeypair>,
    timeout: Duration,
}

impl KeyStore {
    pub fn new(backend: Arc<dyn KvStore>, master: Arc<MasterKeypair>, timeout: Duration) -> Self {
        Self {
            backend,
            master,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Seal `value`: optionally under `wrap` (compressed), then always under
    /// the master keypair.
    fn seal(&self, value: &str, wrap: Option<&Keypair>) -> StoreResult<String> {
        let inner = match wrap {
            Some(keypair) => seal_and_compress(value.as_bytes(), keypair)?,
            None => value.to_owned(),
        };
        Ok(seal_and_sign(inner.as_bytes(), self.master.keypair())?)
    }

    /// Reverse of [`seal`](Self::seal).
    fn unseal(&self, stored: &str, unwrap: Option<&Keypair>) -> StoreResult<String> {
        let inner = open_text(stored, self.master.keypair())?;
        match unwrap {
            Some(keypair) => Ok(open_text(&inner, keypair)?),
            None => Ok(inner),
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout = ?self.timeout, "store operation timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    /// Seal and write `value` at `(address, field)`, overwriting.
    pub async fn put(
        &self,
        address: &str,
        field: &str,
        value: &str,
        wrap: Option<&Keypair>,
    ) -> StoreResult<Ack> {
        let sealed = self.seal(value, wrap)?;
        self.bounded("put", self.backend.put(address, field, sealed))
            .await?;
        tracing::debug!(address, field, "value stored");
        Ok(Ack {
            address: address.to_owned(),
            field: field.to_owned(),
        })
    }

    /// Seal and write `value` only if `(address, field)` is empty.
    ///
    /// Returns [`StoreError::AlreadyExists`] when occupied. This is the
    /// compare-and-swap that keeps two concurrent registrations from
    /// silently overwriting each other.
    pub async fn put_new(
        &self,
        address: &str,
        field: &str,
        value: &str,
        wrap: Option<&Keypair>,
    ) -> StoreResult<Ack> {
        let sealed = self.seal(value, wrap)?;
        let written = self
            .bounded("put_new", self.backend.put_if_absent(address, field, sealed))
            .await?;
        if !written {
            tracing::debug!(address, field, "put_new refused: slot occupied");
            return Err(StoreError::AlreadyExists {
                address: address.to_owned(),
                field: field.to_owned(),
            });
        }
        tracing::debug!(address, field, "value stored (new)");
        Ok(Ack {
            address: address.to_owned(),
            field: field.to_owned(),
        })
    }

    /// Read and open the value at `(address, field)`.
    ///
    /// `Ok(None)` means absent. A present value that fails to open under the
    /// master keypair (or under `unwrap`) is an error, not `None`.
    pub async fn get(
        &self,
        address: &str,
        field: &str,
        unwrap: Option<&Keypair>,
    ) -> StoreResult<Option<String>> {
        let raw = self.bounded("get", self.backend.get(address, field)).await?;
        match raw {
            Some(stored) => self.unseal(&stored, unwrap).map(Some),
            None => Ok(None),
        }
    }

    /// Whether anything at all is stored at `(address, field)`.
    ///
    /// Doesn't open the value: an unreadable record still counts as present.
    pub async fn exists(&self, address: &str, field: &str) -> StoreResult<bool> {
        let raw = self.bounded("exists", self.backend.get(address, field)).await?;
        Ok(raw.is_some())
    }

    /// Delete the value at `(address, field)`.
    pub async fn remove(&self, address: &str, field: &str) -> StoreResult<()> {
        self.bounded("remove", self.backend.remove(address, field))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::open;
    use crate::crypto::EnvelopeError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    fn setup() -> (Arc<MemoryStore>, KeyStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = KeyStore::new(
            backend.clone(),
            Arc::new(MasterKeypair::generate()),
            Duration::from_secs(1),
        );
        (backend, store)
    }

    /// A backend that never answers.
    struct StalledStore;

    #[async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _: &str, _: &str) -> StoreResult<Option<String>> {
            std::future::pending().await
        }
        async fn put(&self, _: &str, _: &str, _: String) -> StoreResult<()> {
            std::future::pending().await
        }
        async fn put_if_absent(&self, _: &str, _: &str, _: String) -> StoreResult<bool> {
            std::future::pending().await
        }
        async fn remove(&self, _: &str, _: &str) -> StoreResult<()> {
            std::future::pending().await
        }
    }

    /// A backend whose calls block their thread, like a disk stuck in fsync.
    struct StuckDiskStore {
        stall: Duration,
    }

    impl StuckDiskStore {
        async fn stall<T: Send + 'static>(&self, value: T) -> StoreResult<T> {
            let stall = self.stall;
            crate::storage::run_blocking(move || {
                std::thread::sleep(stall);
                Ok(value)
            })
            .await
        }
    }

    #[async_trait]
    impl KvStore for StuckDiskStore {
        async fn get(&self, _: &str, _: &str) -> StoreResult<Option<String>> {
            self.stall(None).await
        }
        async fn put(&self, _: &str, _: &str, _: String) -> StoreResult<()> {
            self.stall(()).await
        }
        async fn put_if_absent(&self, _: &str, _: &str, _: String) -> StoreResult<bool> {
            self.stall(true).await
        }
        async fn remove(&self, _: &str, _: &str) -> StoreResult<()> {
            self.stall(()).await
        }
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let (_, store) = setup();
        let ack = store.put("@a", "creds", "hello", None).await.unwrap();
        assert_eq!(ack.address, "@a");
        assert_eq!(
            store.get("@a", "creds", None).await.unwrap().as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn missing_value_is_none_not_error() {
        let (_, store) = setup();
        assert!(store.get("@nobody", "creds", None).await.unwrap().is_none());
        assert!(!store.exists("@nobody", "creds").await.unwrap());
    }

    #[tokio::test]
    async fn raw_backend_never_sees_plaintext() {
        let (backend, store) = setup();
        store
            .put("@a", "creds", "plaintext-marker", None)
            .await
            .unwrap();
        let raw = backend.get_raw("@a", "creds").unwrap();
        assert!(!raw.contains("plaintext-marker"));
    }

    #[tokio::test]
    async fn inner_wrap_requires_the_wrap_keypair() {
        let (backend, store) = setup();
        let owner = Keypair::generate();
        store
            .put("@a", "creds", "double sealed", Some(&owner))
            .await
            .unwrap();

        assert_eq!(
            store
                .get("@a", "creds", Some(&owner))
                .await
                .unwrap()
                .as_deref(),
            Some("double sealed")
        );

        // Without the unwrap keypair, the caller only gets the inner seal.
        let inner = store.get("@a", "creds", None).await.unwrap().unwrap();
        assert_eq!(open(&inner, &owner).unwrap(), b"double sealed");

        // A stranger cannot open the inner layer.
        assert!(matches!(
            store.get("@a", "creds", Some(&Keypair::generate())).await,
            Err(StoreError::Envelope(EnvelopeError::Integrity))
        ));
        assert!(backend.get_raw("@a", "creds").is_some());
    }

    #[tokio::test]
    async fn value_sealed_by_another_master_is_rejected() {
        let backend = Arc::new(MemoryStore::new());
        let first = KeyStore::new(
            backend.clone(),
            Arc::new(MasterKeypair::generate()),
            Duration::from_secs(1),
        );
        let second = KeyStore::new(
            backend,
            Arc::new(MasterKeypair::generate()),
            Duration::from_secs(1),
        );
        first.put("@a", "creds", "x", None).await.unwrap();
        assert!(matches!(
            second.get("@a", "creds", None).await,
            Err(StoreError::Envelope(_))
        ));
        // Still counts as present for uniqueness purposes.
        assert!(second.exists("@a", "creds").await.unwrap());
    }

    #[tokio::test]
    async fn put_new_refuses_occupied_slot() {
        let (_, store) = setup();
        store.put_new("~bob", "owner", "k1", None).await.unwrap();
        let err = store.put_new("~bob", "owner", "k2", None).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(
            store.get("~bob", "owner", None).await.unwrap().as_deref(),
            Some("k1")
        );
    }

    #[tokio::test]
    async fn remove_clears_value() {
        let (_, store) = setup();
        store.put("~x", "owner", "k", None).await.unwrap();
        store.remove("~x", "owner").await.unwrap();
        assert!(!store.exists("~x", "owner").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out() {
        let store = KeyStore::new(
            Arc::new(StalledStore),
            Arc::new(MasterKeypair::generate()),
            Duration::from_millis(250),
        );
        assert!(matches!(
            store.get("@a", "creds", None).await,
            Err(StoreError::Timeout(_))
        ));
        assert!(matches!(
            store.put("@a", "creds", "v", None).await,
            Err(StoreError::Timeout(_))
        ));
        assert!(matches!(
            store.put_new("@a", "creds", "v", None).await,
            Err(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn blocked_disk_times_out_without_pinning_the_runtime() {
        let store = KeyStore::new(
            Arc::new(StuckDiskStore {
                stall: Duration::from_millis(400),
            }),
            Arc::new(MasterKeypair::generate()),
            Duration::from_millis(50),
        );

        let started = std::time::Instant::now();
        assert!(matches!(
            store.put_new("@a", "creds", "v", None).await,
            Err(StoreError::Timeout(_))
        ));
        assert!(matches!(
            store.get("@a", "creds", None).await,
            Err(StoreError::Timeout(_))
        ));
        assert!(started.elapsed() < Duration::from_millis(400));
    }
}
