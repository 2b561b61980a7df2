//! In-process [`KvStore`] on a `DashMap`. Used by tests and by nodes started
//! with `--in-memory`; everything is gone when the process exits.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{KvStore, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Overwrite a raw value, bypassing the keystore. Tests use this to
    /// corrupt records on purpose.
    pub fn insert_raw(&self, address: &str, field: &str, value: impl Into<String>) {
        self.documents
            .insert((address.to_owned(), field.to_owned()), value.into());
    }

    /// Read a raw value, bypassing the keystore.
    pub fn get_raw(&self, address: &str, field: &str) -> Option<String> {
        self.documents
            .get(&(address.to_owned(), field.to_owned()))
            .map(|v| v.value().clone())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, address: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self.get_raw(address, field))
    }

    async fn put(&self, address: &str, field: &str, value: String) -> StoreResult<()> {
        self.insert_raw(address, field, value);
        Ok(())
    }

    async fn put_if_absent(
        &self,
        address: &str,
        field: &str,
        value: String,
    ) -> StoreResult<bool> {
        // The entry guard holds the shard lock, so check and insert are atomic.
        match self.documents.entry((address.to_owned(), field.to_owned())) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn remove(&self, address: &str, field: &str) -> StoreResult<()> {
        self.documents
            .remove(&(address.to_owned(), field.to_owned()));
        Ok(())
    }
}
