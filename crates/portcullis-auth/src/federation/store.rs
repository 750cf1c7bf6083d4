//! Identity provider store trait.
//!
//! Defines the persistence contract for [`IdentityProviderRecord`]s. Two
//! implementations exist: [`MemoryIdentityProviderStore`](super::memory::MemoryIdentityProviderStore)
//! in this crate and the PostgreSQL backend in `portcullis-auth-postgres`.
//!
//! # Concurrency
//!
//! Implementations must let writes on different names proceed independently
//! and serialize writes on the same name with last-write-wins semantics.

use std::sync::Arc;

use async_trait::async_trait;

use super::record::IdentityProviderRecord;

/// Errors raised by identity provider stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored record could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations for identity provider records.
///
/// # Example
///
/// ```ignore
/// use portcullis_auth::federation::{IdentityProviderRecord, IdentityProviderStore};
///
/// async fn example(store: &dyn IdentityProviderStore) -> StoreResult<()> {
///     store.upsert("okta", IdentityProviderRecord::new("okta", "https://okta.example/", "abc")).await?;
///     assert!(store.find("okta").await?.is_some());
///     store.remove("okta").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait IdentityProviderStore: Send + Sync {
    /// Returns a snapshot of every stored record.
    ///
    /// Ordering is unspecified. Filtering and pagination are left to callers.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn query(&self) -> StoreResult<Vec<IdentityProviderRecord>>;

    /// Finds a record by exact (case-sensitive) name.
    ///
    /// The default implementation scans [`query`](Self::query); backends
    /// with indexed lookups should override it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, name: &str) -> StoreResult<Option<IdentityProviderRecord>> {
        Ok(self.query().await?.into_iter().find(|r| r.name == name))
    }

    /// Inserts the record under `name`, or overwrites the mutable fields of
    /// the existing record.
    ///
    /// `name` is authoritative: the stored record's name is always `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn upsert(&self, name: &str, record: IdentityProviderRecord) -> StoreResult<()>;

    /// Removes the record stored under `name`.
    ///
    /// Always returns `true`, whether or not the record existed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage operation fails.
    async fn remove(&self, name: &str) -> StoreResult<bool>;
}

/// Shared, type-erased store handle.
pub type DynIdentityProviderStore = Arc<dyn IdentityProviderStore>;
