//! Builds the application state from configuration.
//!
//! Statically configured providers are registered into the base scheme and
//! handler providers; the dynamic providers are layered on top of them and
//! read everything else from the configured store.

use std::sync::Arc;

use anyhow::Context;
use portcullis_auth::federation::{
    AuthenticationScheme, DefaultOptionsFactory, DiscoveryClient, DynIdentityProviderStore,
    DynamicHandlerProvider, DynamicSchemeProvider, HandlerFactory, HandlerKind,
    MemoryIdentityProviderStore, OidcHandlerFactory, OptionsFactory, SchemeProvider,
    StaticHandlerProvider, StaticOptionsMonitor, StaticSchemeProvider,
};
use portcullis_auth_postgres::{PostgresIdentityProviderStore, migrations};
use tracing::info;
use url::Url;

use crate::admin::AdminState;
use crate::config::{AppConfig, StorageBackend};
use crate::login::LoginState;
use crate::state::AppState;

/// Opens the configured store and builds the application state.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or migrated, or if a
/// statically configured provider is invalid.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store: DynIdentityProviderStore = match cfg.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory identity provider store");
            Arc::new(MemoryIdentityProviderStore::new())
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres is not configured")?;
            let pool = portcullis_auth_postgres::connect(&pg.url, pg.pool_size)
                .await
                .context("failed to connect to PostgreSQL")?;
            migrations::run(&pool)
                .await
                .context("failed to apply migrations")?;
            info!(pool_size = pg.pool_size, "Using PostgreSQL identity provider store");
            Arc::new(PostgresIdentityProviderStore::new(pool))
        }
    };

    build_state_with_store(cfg, store)
}

/// Builds the application state over an existing store.
///
/// # Errors
///
/// Returns an error if the base URL or a statically configured provider is
/// invalid.
pub fn build_state_with_store(
    cfg: &AppConfig,
    store: DynIdentityProviderStore,
) -> anyhow::Result<AppState> {
    let base_url = Url::parse(&cfg.base_url()).context("invalid server base URL")?;

    let http_client = reqwest::Client::builder()
        .connect_timeout(cfg.federation.request_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let handler_factory: Arc<dyn HandlerFactory> =
        Arc::new(OidcHandlerFactory::new(DiscoveryClient::new(http_client)));
    let options_factory: Arc<dyn OptionsFactory> =
        Arc::new(DefaultOptionsFactory::from_config(&cfg.federation));

    let static_schemes = Arc::new(StaticSchemeProvider::new());
    let static_handlers = Arc::new(StaticHandlerProvider::new());
    for provider in &cfg.providers {
        let record = provider.to_record();
        let options = options_factory
            .create(&record)
            .with_context(|| format!("invalid static provider '{}'", record.name))?;

        let mut scheme = AuthenticationScheme::new(&record.name, HandlerKind::OpenIdConnect);
        scheme.display_name = record.display_name.clone();

        let handler =
            handler_factory.create(&scheme, Arc::new(StaticOptionsMonitor::new(options)));
        if !static_schemes.add_scheme(scheme.clone()) {
            anyhow::bail!("duplicate static provider '{}'", record.name);
        }
        static_handlers.register(scheme, handler);
        info!(scheme = %record.name, authority = %record.authority, "Registered static provider");
    }

    let schemes = Arc::new(DynamicSchemeProvider::new(
        static_schemes.clone(),
        store.clone(),
    ));
    let handlers = Arc::new(
        DynamicHandlerProvider::new(
            static_schemes,
            static_handlers,
            store.clone(),
            options_factory.clone(),
            handler_factory,
        )
        .with_init_timeout(cfg.federation.handler_init_timeout),
    );

    let admin = AdminState::new(store, options_factory, handlers.clone(), base_url.clone())
        .with_api_token(cfg.admin.api_token.clone())
        .with_invalidate_on_delete(cfg.federation.invalidate_on_delete);
    let login = LoginState {
        schemes,
        handlers,
        base_url,
    };

    Ok(AppState { admin, login })
}
