//! Federation configuration.
//!
//! Process-wide settings applied to every dynamically registered identity
//! provider: provider-level defaults, the global post-configuration
//! relaxations, and the timeouts used while constructing handlers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default local redirect path for OpenID Connect callbacks.
pub const DEFAULT_CALLBACK_PATH: &str = "/signin-oidc";

/// External identity provider federation configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [federation]
/// default_callback_path = "/signin-oidc"
/// default_scopes = ["openid", "profile"]
/// allow_http = false
/// request_timeout = "10s"
/// handler_init_timeout = "30s"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Callback path used when a provider record does not specify one.
    pub default_callback_path: String,

    /// Scopes requested when a provider record does not specify any.
    pub default_scopes: Vec<String>,

    /// Allow plain HTTP authorities for discovery.
    /// This should only be enabled for local development and tests.
    pub allow_http: bool,

    /// Timeout for a single discovery document request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Upper bound on constructing and initializing a handler for a
    /// dynamically registered provider.
    #[serde(with = "humantime_serde")]
    pub handler_init_timeout: Duration,

    /// Maximum accepted size of a discovery document.
    pub max_discovery_bytes: usize,

    /// Drop the cached handler when a provider is deleted through the
    /// administration API. Off by default: a cached handler stays servable
    /// until process exit.
    pub invalidate_on_delete: bool,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            default_callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            default_scopes: vec!["openid".to_string(), "profile".to_string()],
            allow_http: false,
            request_timeout: Duration::from_secs(10),
            handler_init_timeout: Duration::from_secs(30),
            max_discovery_bytes: 1024 * 1024, // 1 MB
            invalidate_on_delete: false,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl FederationConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The default callback path does not start with `/`
    /// - The default scopes do not include `openid`
    /// - A timeout or the discovery size limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_callback_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "federation.default_callback_path must start with '/': '{}'",
                self.default_callback_path
            )));
        }

        if !self.default_scopes.iter().any(|s| s == "openid") {
            return Err(ConfigError::InvalidValue(
                "federation.default_scopes must include 'openid'".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.handler_init_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "federation timeouts must be > 0".to_string(),
            ));
        }

        if self.max_discovery_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "federation.max_discovery_bytes must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
