//! PostgreSQL storage backend for Portcullis identity providers.
//!
//! Provides [`PostgresIdentityProviderStore`], a durable implementation of
//! [`IdentityProviderStore`](portcullis_auth::federation::IdentityProviderStore)
//! backed by the `external_identity_provider` table. The schema ships as
//! embedded migrations (see [`migrations::run`]).
//!
//! # Example
//!
//! ```ignore
//! use portcullis_auth_postgres::{PostgresIdentityProviderStore, connect, migrations};
//!
//! let pool = connect("postgres://localhost/portcullis", 10).await?;
//! migrations::run(&pool).await?;
//! let store = PostgresIdentityProviderStore::new(pool);
//! ```

pub mod identity_provider;
pub mod migrations;

use portcullis_auth::federation::StoreError;
use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use identity_provider::PostgresIdentityProviderStore;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresStoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored column could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PostgresStoreError {
    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if the database could not be reached at all.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx_core::Error::Io(_)
                    | sqlx_core::Error::PoolTimedOut
                    | sqlx_core::Error::PoolClosed
                    | sqlx_core::Error::Tls(_)
            )
        )
    }
}

impl From<PostgresStoreError> for StoreError {
    fn from(err: PostgresStoreError) -> Self {
        match err {
            PostgresStoreError::Serialization(e) => StoreError::Serialization(e),
            other => StoreError::backend(other.to_string()),
        }
    }
}

/// Result type for backend operations.
pub type PostgresResult<T> = Result<T, PostgresStoreError>;

/// Opens a connection pool.
///
/// # Errors
///
/// Returns an error if the initial connection fails.
pub async fn connect(database_url: &str, pool_size: u32) -> PostgresResult<PgPool> {
    let pool = PoolOptions::<Postgres>::new()
        .max_connections(pool_size)
        .connect(database_url)
        .await?;
    tracing::debug!(pool_size, "PostgreSQL connection pool created");
    Ok(pool)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_becomes_backend_error() {
        let err = PostgresStoreError::from(sqlx_core::Error::PoolTimedOut);
        assert!(err.is_database_error());
        assert!(err.is_connection_error());

        let store_err = StoreError::from(err);
        assert!(matches!(store_err, StoreError::Backend(_)));
        assert!(store_err.to_string().contains("Database error"));
    }

    #[test]
    fn test_serialization_error_is_preserved() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let store_err = StoreError::from(PostgresStoreError::from(json_err));
        assert!(matches!(store_err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_migration_error_display() {
        let err = PostgresStoreError::Migration("checksum mismatch".into());
        assert!(!err.is_database_error());
        assert!(!err.is_connection_error());
        assert_eq!(err.to_string(), "Migration error: checksum mismatch");
    }
}
