//! Authentication handler contracts and the boot-time handler provider.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use url::Url;

use super::error::FederationError;
use super::monitor::OptionsMonitor;
use super::options::OidcOptions;
use super::scheme::AuthenticationScheme;

/// Per-request information handed to handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Public base URL of this server, used to build redirect URIs.
    pub base_url: Url,
    /// Correlation identifier, if the caller has one.
    pub request_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// A live protocol handler for one scheme.
#[async_trait]
pub trait AuthenticationHandler: Send + Sync {
    /// Returns the scheme this handler was initialized for, if any.
    fn scheme(&self) -> Option<AuthenticationScheme>;

    /// Binds the handler to `scheme` and performs any network setup.
    ///
    /// Calling this more than once is allowed and has no further effect.
    async fn initialize(
        &self,
        scheme: &AuthenticationScheme,
        ctx: &RequestContext,
    ) -> Result<(), FederationError>;

    /// Builds the URL the user agent is redirected to in order to log in.
    fn challenge(
        &self,
        ctx: &RequestContext,
        state: &str,
        nonce: &str,
    ) -> Result<Url, FederationError>;
}

/// Shared, type-erased handler.
pub type DynHandler = Arc<dyn AuthenticationHandler>;

impl std::fmt::Debug for dyn AuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationHandler")
            .field("scheme", &self.scheme().map(|s| s.name))
            .finish()
    }
}

/// Constructs handlers bound to an options source.
///
/// Construction must not perform I/O; that belongs in
/// [`AuthenticationHandler::initialize`].
pub trait HandlerFactory: Send + Sync {
    fn create(
        &self,
        scheme: &AuthenticationScheme,
        options: Arc<dyn OptionsMonitor<OidcOptions>>,
    ) -> DynHandler;
}

/// Resolves the live handler for a scheme name.
#[async_trait]
pub trait HandlerProvider: Send + Sync {
    /// Returns the initialized handler for `name`, or `None` if the scheme is
    /// unknown or has no handler.
    async fn get_handler(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<DynHandler>, FederationError>;
}

/// Shared, type-erased handler provider.
pub type DynHandlerProvider = Arc<dyn HandlerProvider>;

struct StaticEntry {
    scheme: AuthenticationScheme,
    handler: DynHandler,
    initialized: OnceCell<()>,
}

/// Owns the handlers registered at boot and initializes each one the first
/// time it is requested.
#[derive(Default)]
pub struct StaticHandlerProvider {
    entries: DashMap<String, Arc<StaticEntry>>,
}

impl StaticHandlerProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `scheme`, replacing any previous handler.
    pub fn register(&self, scheme: AuthenticationScheme, handler: DynHandler) {
        let name = scheme.name.clone();
        let entry = Arc::new(StaticEntry {
            scheme,
            handler,
            initialized: OnceCell::new(),
        });
        if self.entries.insert(name.clone(), entry).is_some() {
            tracing::debug!(scheme = %name, "Replaced static handler");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl HandlerProvider for StaticHandlerProvider {
    async fn get_handler(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<DynHandler>, FederationError> {
        // Clone the entry out so no shard lock is held across initialization.
        let Some(entry) = self.entries.get(name).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        entry
            .initialized
            .get_or_try_init(|| entry.handler.initialize(&entry.scheme, ctx))
            .await?;

        Ok(Some(entry.handler.clone()))
    }
}
