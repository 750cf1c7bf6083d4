//! Admin API state.

use std::sync::Arc;

use portcullis_auth::federation::{DynIdentityProviderStore, DynamicHandlerProvider, OptionsFactory};
use url::Url;

/// State for the identity provider admin endpoints.
///
/// Included in [`AppState`](crate::state::AppState) and made available to
/// handlers via `FromRef`.
#[derive(Clone)]
pub struct AdminState {
    /// Backing identity provider store.
    pub store: DynIdentityProviderStore,

    /// Validates records before they are persisted.
    pub options_factory: Arc<dyn OptionsFactory>,

    /// Handler cache, invalidated on delete when enabled.
    pub handlers: Arc<DynamicHandlerProvider>,

    /// Public base URL used for `Location` headers and list entry URLs.
    pub base_url: Url,

    /// Bearer token required on every admin request, if set.
    pub api_token: Option<Arc<str>>,

    /// Drop a provider's cached handler when the provider is deleted.
    pub invalidate_on_delete: bool,
}

impl AdminState {
    #[must_use]
    pub fn new(
        store: DynIdentityProviderStore,
        options_factory: Arc<dyn OptionsFactory>,
        handlers: Arc<DynamicHandlerProvider>,
        base_url: Url,
    ) -> Self {
        Self {
            store,
            options_factory,
            handlers,
            base_url,
            api_token: None,
            invalidate_on_delete: false,
        }
    }

    #[must_use]
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.is_empty()).map(Arc::from);
        self
    }

    #[must_use]
    pub fn with_invalidate_on_delete(mut self, invalidate: bool) -> Self {
        self.invalidate_on_delete = invalidate;
        self
    }
}
