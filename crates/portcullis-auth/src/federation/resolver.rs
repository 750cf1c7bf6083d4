//! Handler resolution for statically and dynamically registered schemes.
//!
//! # Resolution order
//!
//! 1. A handler cached for the name is returned immediately.
//! 2. A name known to the base scheme provider is delegated to the base
//!    handler provider. Its result is not cached here.
//! 3. Otherwise the store is consulted. An unknown name resolves to `None`.
//! 4. A stored record is turned into options, a handler is constructed and
//!    initialized, and the result is cached for the name.
//!
//! # Concurrency
//!
//! Each name owns a [`OnceCell`] in the cache. The map's shard lock is held
//! only while the cell is fetched or inserted; construction and
//! initialization run inside [`OnceCell::get_or_try_init`], so concurrent
//! first requests for one name wait on a single initialization and observe
//! the same instance. A failed, timed-out or cancelled initialization leaves
//! the cell empty and the next request tries again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::error::FederationError;
use super::handler::{DynHandler, DynHandlerProvider, HandlerFactory, HandlerProvider, RequestContext};
use super::monitor::StaticOptionsMonitor;
use super::options::OptionsFactory;
use super::record::IdentityProviderRecord;
use super::scheme::{AuthenticationScheme, DynSchemeProvider};
use super::store::DynIdentityProviderStore;

type HandlerCell = Arc<OnceCell<DynHandler>>;

/// Handler provider that adds store-backed schemes on top of a base
/// provider and memoizes one handler per dynamic scheme.
pub struct DynamicHandlerProvider {
    base_schemes: DynSchemeProvider,
    base_handlers: DynHandlerProvider,
    store: DynIdentityProviderStore,
    options_factory: Arc<dyn OptionsFactory>,
    handler_factory: Arc<dyn HandlerFactory>,
    init_timeout: Duration,
    cache: DashMap<String, HandlerCell>,
}

impl DynamicHandlerProvider {
    #[must_use]
    pub fn new(
        base_schemes: DynSchemeProvider,
        base_handlers: DynHandlerProvider,
        store: DynIdentityProviderStore,
        options_factory: Arc<dyn OptionsFactory>,
        handler_factory: Arc<dyn HandlerFactory>,
    ) -> Self {
        Self {
            base_schemes,
            base_handlers,
            store,
            options_factory,
            handler_factory,
            init_timeout: Duration::from_secs(30),
            cache: DashMap::new(),
        }
    }

    /// Bounds handler initialization. Defaults to 30 seconds.
    #[must_use]
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Drops the cached handler for `name`.
    ///
    /// Returns `true` if an initialized handler was removed. Requests already
    /// holding the handler keep using it; the next lookup builds a new one
    /// from the current record.
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = self
            .cache
            .remove(name)
            .is_some_and(|(_, cell)| cell.initialized());
        if removed {
            tracing::info!(scheme = name, "Invalidated cached authentication handler");
        }
        removed
    }

    /// Names of schemes with an initialized cached handler, sorted.
    #[must_use]
    pub fn cached_schemes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache
            .iter()
            .filter(|e| e.value().initialized())
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    fn cell(&self, name: &str) -> HandlerCell {
        if let Some(cell) = self.cache.get(name) {
            return cell.value().clone();
        }
        self.cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone()
    }

    async fn build(
        &self,
        ctx: &RequestContext,
        record: IdentityProviderRecord,
    ) -> Result<DynHandler, FederationError> {
        let options = self.options_factory.create(&record)?;
        let scheme = AuthenticationScheme::from_record(&record);
        let handler = self
            .handler_factory
            .create(&scheme, Arc::new(StaticOptionsMonitor::new(options)));

        tokio::time::timeout(self.init_timeout, handler.initialize(&scheme, ctx))
            .await
            .map_err(|_| FederationError::timeout(&scheme.name, self.init_timeout))??;

        tracing::info!(
            scheme = %scheme.name,
            authority = %record.authority,
            "Initialized authentication handler for dynamic identity provider"
        );
        Ok(handler)
    }
}

#[async_trait]
impl HandlerProvider for DynamicHandlerProvider {
    async fn get_handler(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<DynHandler>, FederationError> {
        if let Some(handler) = self.cache.get(name).and_then(|c| c.value().get().cloned()) {
            tracing::trace!(scheme = name, "Authentication handler cache hit");
            return Ok(Some(handler));
        }

        if self.base_schemes.get_scheme(name).await?.is_some() {
            return self.base_handlers.get_handler(ctx, name).await;
        }

        let Some(record) = self.store.find(name).await? else {
            return Ok(None);
        };

        let cell = self.cell(name);
        let handler = cell
            .get_or_try_init(|| self.build(ctx, record))
            .await
            .inspect_err(|e| {
                tracing::warn!(scheme = name, error = %e, "Failed to build authentication handler");
            })?;

        Ok(Some(handler.clone()))
    }
}
