//! Embedded schema migrations.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use tracing::{info, instrument};

use crate::{PgPool, PostgresResult, PostgresStoreError};

/// Add new migrations here in chronological order: (version, description, sql).
macro_rules! embedded_migrations {
    () => {
        &[(
            20260301000001i64,
            "external_identity_provider",
            include_str!("../migrations/20260301000001_external_identity_provider.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Applies pending migrations. Applied versions are tracked in
/// `_sqlx_migrations`.
///
/// # Errors
///
/// Returns `PostgresStoreError::Migration` if a migration fails.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> PostgresResult<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running identity provider migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: true,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresStoreError::Migration(e.to_string()))?;

    info!("Identity provider migrations applied");
    Ok(())
}
