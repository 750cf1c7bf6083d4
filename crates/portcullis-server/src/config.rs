use portcullis_auth::FederationConfig;
use portcullis_auth::federation::IdentityProviderRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// External identity provider federation settings
    #[serde(default)]
    pub federation: FederationConfig,
    /// Admin API protection
    #[serde(default)]
    pub admin: AdminConfig,
    /// OpenID Connect schemes registered at boot
    #[serde(default)]
    pub providers: Vec<StaticProviderConfig>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port must be > 0"));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::invalid("server.body_limit_bytes must be > 0"));
        }
        if let Some(base_url) = &self.server.base_url {
            url::Url::parse(base_url).map_err(|e| {
                ConfigError::invalid(format!("server.base_url '{base_url}' is not a URL: {e}"))
            })?;
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self.storage.backend == StorageBackend::Postgres {
            let url = self.storage.postgres.as_ref().map(|p| p.url.trim());
            if url.is_none_or(str::is_empty) {
                return Err(ConfigError::invalid(
                    "storage.postgres.url is required when storage.backend = \"postgres\"",
                ));
            }
        }

        self.federation
            .validate()
            .map_err(|e| ConfigError::invalid(format!("federation: {e}")))?;

        let mut names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::invalid("providers[].name must not be empty"));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "providers: duplicate scheme name '{}'",
                    provider.name
                )));
            }
        }

        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Returns the base URL for the server.
    /// If `base_url` is configured, returns that; otherwise computes from host:port.
    pub fn base_url(&self) -> String {
        self.server
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL, used for `Location` headers and OIDC redirect URIs.
    /// If not set, defaults to http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: Option<PostgresStorageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStorageConfig {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token required by `/api/providers`. Unset leaves the API open.
    /// Prefer PORTCULLIS__ADMIN__API_TOKEN over the config file.
    #[serde(default)]
    pub api_token: Option<String>,
}

/// An OpenID Connect scheme wired up at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticProviderConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub authority: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub callback_path: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StaticProviderConfig {
    pub fn to_record(&self) -> IdentityProviderRecord {
        IdentityProviderRecord {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            authority: self.authority.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            callback_path: self.callback_path.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "portcullis.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        // Environment variable overrides, e.g., PORTCULLIS__SERVER__PORT=9090
        let env = Environment::with_prefix("PORTCULLIS")
            .try_parsing(true)
            .separator("__");
        load_config_with_env(path, env)
    }

    pub fn load_config_with_env(
        path: Option<&str>,
        env: Environment,
    ) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        builder = builder.add_source(env);

        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
