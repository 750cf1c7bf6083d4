//! In-memory identity provider store.
//!
//! Used for tests and ephemeral deployments. Records live in a [`DashMap`],
//! so writes to different names only contend when they hash to the same
//! shard, and writes to the same name are serialized by the shard lock.

use async_trait::async_trait;
use dashmap::DashMap;

use super::record::IdentityProviderRecord;
use super::store::{IdentityProviderStore, StoreResult};

/// Concurrent in-memory store keyed by provider name (case-sensitive).
#[derive(Debug, Default)]
pub struct MemoryIdentityProviderStore {
    records: DashMap<String, IdentityProviderRecord>,
}

impl MemoryIdentityProviderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = IdentityProviderRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.records.insert(record.name.clone(), record);
        }
        store
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl IdentityProviderStore for MemoryIdentityProviderStore {
    async fn query(&self) -> StoreResult<Vec<IdentityProviderRecord>> {
        Ok(self.records.iter().map(|e| e.value().clone()).collect())
    }

    async fn find(&self, name: &str) -> StoreResult<Option<IdentityProviderRecord>> {
        Ok(self.records.get(name).map(|e| e.value().clone()))
    }

    async fn upsert(&self, name: &str, mut record: IdentityProviderRecord) -> StoreResult<()> {
        // Every field but the name is mutable, so an overwrite is an update.
        record.name = name.to_string();
        self.records.insert(name.to_string(), record);
        tracing::debug!(name, "Upserted identity provider");
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        if self.records.remove(name).is_some() {
            tracing::debug!(name, "Removed identity provider");
        }
        Ok(true)
    }
}
