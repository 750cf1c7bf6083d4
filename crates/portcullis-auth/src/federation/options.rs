//! OpenID Connect handler options and the factory that derives them from
//! stored provider records.
//!
//! [`OptionsFactory::create`] is side-effect free apart from running the
//! registered [`PostConfigureOptions`] hooks, so the administration API can
//! call it to validate a record before persisting it.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::error::FederationError;
use super::record::IdentityProviderRecord;
use crate::config::{DEFAULT_CALLBACK_PATH, FederationConfig};

/// Options for one OpenID Connect protocol handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcOptions {
    /// Issuer URL of the partner.
    pub authority: String,

    /// Client identifier presented to the partner.
    pub client_id: String,

    /// Confidential client secret.
    pub client_secret: Option<String>,

    /// Local redirect path, always starting with `/`.
    pub callback_path: String,

    /// Scopes requested during the challenge.
    pub scopes: Vec<String>,

    /// OAuth 2.0 response type requested during the challenge.
    pub response_type: String,

    /// Reject discovery over plain HTTP.
    pub require_https_metadata: bool,

    /// Timeout for fetching the discovery document.
    pub metadata_timeout: Duration,

    /// Maximum accepted discovery document size in bytes.
    pub max_metadata_bytes: usize,
}

impl Default for OidcOptions {
    fn default() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            client_secret: None,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            scopes: vec!["openid".to_string(), "profile".to_string()],
            response_type: "code".to_string(),
            require_https_metadata: true,
            metadata_timeout: Duration::from_secs(10),
            max_metadata_bytes: 1024 * 1024,
        }
    }
}

impl OidcOptions {
    /// Parses the authority as an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProviderConfiguration` naming `authority` if the value
    /// is empty, not an absolute URL, or not HTTP(S).
    pub fn authority_url(&self) -> Result<Url, FederationError> {
        let authority = self.authority.trim();
        if authority.is_empty() {
            return Err(FederationError::invalid_configuration(
                "authority",
                "an authority is required",
            ));
        }

        let url = Url::parse(authority).map_err(|e| {
            FederationError::invalid_configuration(
                "authority",
                format!("'{}' is not an absolute URL: {}", authority, e),
            )
        })?;

        match url.scheme() {
            "https" | "http" => Ok(url),
            other => Err(FederationError::invalid_configuration(
                "authority",
                format!("unsupported URL scheme '{}'", other),
            )),
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProviderConfiguration` carrying the offending field:
    /// - `authority`: missing, malformed, or plain HTTP while HTTPS metadata is required
    /// - `client_id`: empty
    /// - `callback_path`: does not start with `/`
    /// - `scopes`: does not include `openid`
    pub fn validate(&self) -> Result<(), FederationError> {
        let authority = self.authority_url()?;
        if self.require_https_metadata && authority.scheme() != "https" {
            return Err(FederationError::invalid_configuration(
                "authority",
                "the authority must use HTTPS",
            ));
        }

        if self.client_id.trim().is_empty() {
            return Err(FederationError::invalid_configuration(
                "client_id",
                "a client ID is required",
            ));
        }

        if !self.callback_path.starts_with('/') {
            return Err(FederationError::invalid_configuration(
                "callback_path",
                format!("'{}' must start with '/'", self.callback_path),
            ));
        }

        if !self.scopes.iter().any(|s| s == "openid") {
            return Err(FederationError::invalid_configuration(
                "scopes",
                "the 'openid' scope is required",
            ));
        }

        Ok(())
    }
}

/// A process-wide hook that runs after options are built from a record.
///
/// Hooks let cross-cutting configuration be layered on every provider
/// without the factory knowing about it.
pub trait PostConfigureOptions: Send + Sync {
    /// Adjusts `options` for the scheme called `name`.
    fn post_configure(&self, name: &str, options: &mut OidcOptions);
}

/// Applies [`FederationConfig`] relaxations and limits to every provider.
#[derive(Debug, Clone)]
pub struct FederationPostConfigure {
    config: FederationConfig,
}

impl FederationPostConfigure {
    #[must_use]
    pub fn new(config: FederationConfig) -> Self {
        Self { config }
    }
}

impl PostConfigureOptions for FederationPostConfigure {
    fn post_configure(&self, name: &str, options: &mut OidcOptions) {
        if self.config.allow_http && options.require_https_metadata {
            tracing::debug!(scheme = name, "Relaxing HTTPS metadata requirement");
            options.require_https_metadata = false;
        }
        options.metadata_timeout = self.config.request_timeout;
        options.max_metadata_bytes = self.config.max_discovery_bytes;
    }
}

/// Runs several hooks in registration order.
#[derive(Default, Clone)]
pub struct PostConfigureChain {
    hooks: Vec<Arc<dyn PostConfigureOptions>>,
}

impl PostConfigureChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, hook: Arc<dyn PostConfigureOptions>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl PostConfigureOptions for PostConfigureChain {
    fn post_configure(&self, name: &str, options: &mut OidcOptions) {
        for hook in &self.hooks {
            hook.post_configure(name, options);
        }
    }
}

/// Converts stored records into validated handler options.
pub trait OptionsFactory: Send + Sync {
    /// Builds options for `record`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProviderConfiguration` if the resulting options fail
    /// validation.
    fn create(&self, record: &IdentityProviderRecord) -> Result<OidcOptions, FederationError>;
}

/// Default factory: handler defaults, then record fields, then hooks.
pub struct DefaultOptionsFactory {
    defaults: OidcOptions,
    post_configure: Arc<dyn PostConfigureOptions>,
}

impl DefaultOptionsFactory {
    /// Creates a factory starting from `defaults`.
    #[must_use]
    pub fn new(defaults: OidcOptions, post_configure: Arc<dyn PostConfigureOptions>) -> Self {
        Self {
            defaults,
            post_configure,
        }
    }

    /// Creates a factory whose defaults and hooks come from `config`.
    #[must_use]
    pub fn from_config(config: &FederationConfig) -> Self {
        let defaults = OidcOptions {
            callback_path: config.default_callback_path.clone(),
            scopes: config.default_scopes.clone(),
            ..OidcOptions::default()
        };
        let hooks = PostConfigureChain::new()
            .with(Arc::new(FederationPostConfigure::new(config.clone())));

        Self::new(defaults, Arc::new(hooks))
    }
}

impl OptionsFactory for DefaultOptionsFactory {
    fn create(&self, record: &IdentityProviderRecord) -> Result<OidcOptions, FederationError> {
        let mut options = self.defaults.clone();

        options.authority = record.authority.trim().to_string();
        options.client_id = record.client_id.trim().to_string();
        options.client_secret = record.client_secret.clone();

        if let Some(path) = record.effective_callback_path() {
            options.callback_path = path.to_string();
        }

        if !record.scopes.is_empty() {
            options.scopes = record.scopes.clone();
        }

        self.post_configure.post_configure(&record.name, &mut options);

        options.validate()?;
        Ok(options)
    }
}
