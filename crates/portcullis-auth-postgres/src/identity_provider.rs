//! Identity provider storage.
//!
//! One row per provider in `external_identity_provider`, keyed by name.
//! Upserts are a single `INSERT .. ON CONFLICT` statement, so concurrent
//! writes to the same name serialize on the primary key row lock and the
//! last writer wins.

use async_trait::async_trait;
use portcullis_auth::federation::{IdentityProviderRecord, IdentityProviderStore, StoreResult};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::instrument;

use crate::{PgPool, PostgresResult};

// =============================================================================
// Types
// =============================================================================

type ProviderTuple = (
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    serde_json::Value,
);

/// Identity provider row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProviderRow {
    pub name: String,
    pub display_name: Option<String>,
    pub authority: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub callback_path: Option<String>,
    /// Scopes as a JSONB array of strings.
    pub scopes: serde_json::Value,
}

impl IdentityProviderRow {
    fn from_tuple(row: ProviderTuple) -> Self {
        Self {
            name: row.0,
            display_name: row.1,
            authority: row.2,
            client_id: row.3,
            client_secret: row.4,
            callback_path: row.5,
            scopes: row.6,
        }
    }

    /// Converts the row into a record.
    ///
    /// # Errors
    ///
    /// Returns an error if `scopes` is not an array of strings.
    pub fn into_record(self) -> PostgresResult<IdentityProviderRecord> {
        let scopes = match self.scopes {
            serde_json::Value::Null => Vec::new(),
            value => serde_json::from_value(value)?,
        };

        Ok(IdentityProviderRecord {
            name: self.name,
            display_name: self.display_name,
            authority: self.authority,
            client_id: self.client_id,
            client_secret: self.client_secret,
            callback_path: self.callback_path,
            scopes,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT name, display_name, authority, client_id, client_secret, callback_path, scopes
    FROM external_identity_provider
"#;

// =============================================================================
// IdentityProvider Storage
// =============================================================================

/// PostgreSQL-backed [`IdentityProviderStore`].
#[derive(Debug, Clone)]
pub struct PostgresIdentityProviderStore {
    pool: PgPool,
}

impl PostgresIdentityProviderStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn list_all(&self) -> PostgresResult<Vec<IdentityProviderRecord>> {
        let rows: Vec<ProviderTuple> = query_as(&format!("{SELECT_COLUMNS} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| IdentityProviderRow::from_tuple(row).into_record())
            .collect()
    }

    async fn find_by_name(&self, name: &str) -> PostgresResult<Option<IdentityProviderRecord>> {
        let row: Option<ProviderTuple> = query_as(&format!("{SELECT_COLUMNS} WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| IdentityProviderRow::from_tuple(row).into_record())
            .transpose()
    }

    async fn upsert_row(&self, name: &str, record: &IdentityProviderRecord) -> PostgresResult<()> {
        let scopes = serde_json::to_value(&record.scopes)?;

        query(
            r#"
            INSERT INTO external_identity_provider
                (name, display_name, authority, client_id, client_secret, callback_path, scopes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                authority = EXCLUDED.authority,
                client_id = EXCLUDED.client_id,
                client_secret = EXCLUDED.client_secret,
                callback_path = EXCLUDED.callback_path,
                scopes = EXCLUDED.scopes,
                updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(&record.display_name)
        .bind(&record.authority)
        .bind(&record.client_id)
        .bind(&record.client_secret)
        .bind(&record.callback_path)
        .bind(scopes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_row(&self, name: &str) -> PostgresResult<u64> {
        let result = query("DELETE FROM external_identity_provider WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl IdentityProviderStore for PostgresIdentityProviderStore {
    #[instrument(level = "debug", skip(self))]
    async fn query(&self) -> StoreResult<Vec<IdentityProviderRecord>> {
        Ok(self.list_all().await?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn find(&self, name: &str) -> StoreResult<Option<IdentityProviderRecord>> {
        Ok(self.find_by_name(name).await?)
    }

    #[instrument(level = "debug", skip(self, record))]
    async fn upsert(&self, name: &str, record: IdentityProviderRecord) -> StoreResult<()> {
        Ok(self.upsert_row(name, &record).await?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn remove(&self, name: &str) -> StoreResult<bool> {
        let removed = self.delete_row(name).await?;
        tracing::debug!(removed, "Deleted identity provider rows");
        Ok(true)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(scopes: serde_json::Value) -> IdentityProviderRow {
        IdentityProviderRow::from_tuple((
            "okta".into(),
            Some("Okta".into()),
            "https://okta.example/".into(),
            "abc".into(),
            None,
            Some("/signin-okta".into()),
            scopes,
        ))
    }

    #[test]
    fn test_row_into_record() {
        let record = row(serde_json::json!(["openid", "email"]))
            .into_record()
            .unwrap();

        assert_eq!(record.name, "okta");
        assert_eq!(record.display_name.as_deref(), Some("Okta"));
        assert_eq!(record.callback_path.as_deref(), Some("/signin-okta"));
        assert_eq!(record.scopes, vec!["openid", "email"]);
        assert!(record.client_secret.is_none());
    }

    #[test]
    fn test_null_scopes_are_empty() {
        let record = row(serde_json::Value::Null).into_record().unwrap();
        assert!(record.scopes.is_empty());
    }

    #[test]
    fn test_malformed_scopes_are_rejected() {
        let err = row(serde_json::json!({"scope": "openid"}))
            .into_record()
            .unwrap_err();
        assert!(matches!(err, crate::PostgresStoreError::Serialization(_)));
    }

    #[test]
    fn test_select_targets_table() {
        assert!(SELECT_COLUMNS.contains("FROM external_identity_provider"));
    }
}
