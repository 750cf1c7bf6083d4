//! Authentication schemes and scheme resolution.
//!
//! [`StaticSchemeProvider`] holds the schemes registered at boot.
//! [`DynamicSchemeProvider`] wraps any [`SchemeProvider`] and falls through to
//! the identity provider store on a miss, so dynamically registered partners
//! become visible without a restart.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use super::error::FederationError;
use super::record::IdentityProviderRecord;
use super::store::DynIdentityProviderStore;

/// The protocol handler a scheme is served by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlerKind {
    /// OpenID Connect relying party.
    OpenIdConnect,
    /// Any other handler, identified by a free-form name.
    Custom(String),
}

/// Where a scheme was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeSource {
    /// Registered at boot.
    Static,
    /// Synthesized from an identity provider record.
    Dynamic,
}

/// A named authentication mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub handler_kind: HandlerKind,
    pub source: SchemeSource,
}

impl AuthenticationScheme {
    /// Creates a statically registered scheme.
    #[must_use]
    pub fn new(name: impl Into<String>, handler_kind: HandlerKind) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            handler_kind,
            source: SchemeSource::Static,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Synthesizes the OpenID Connect scheme for a stored record.
    #[must_use]
    pub fn from_record(record: &IdentityProviderRecord) -> Self {
        Self {
            name: record.name.clone(),
            display_name: record.display_name.clone(),
            handler_kind: HandlerKind::OpenIdConnect,
            source: SchemeSource::Dynamic,
        }
    }

    /// Returns the display name, falling back to the name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Scheme lookup and registration.
#[async_trait]
pub trait SchemeProvider: Send + Sync {
    /// Looks a scheme up by exact name.
    async fn get_scheme(&self, name: &str) -> Result<Option<AuthenticationScheme>, FederationError>;

    /// Enumerates every known scheme.
    async fn get_all_schemes(&self) -> Result<Vec<AuthenticationScheme>, FederationError>;

    /// Returns the scheme used for challenges when none is named.
    async fn default_challenge_scheme(
        &self,
    ) -> Result<Option<AuthenticationScheme>, FederationError>;

    /// Registers a scheme. Returns `false` if the name is already taken.
    fn add_scheme(&self, scheme: AuthenticationScheme) -> bool;

    /// Unregisters a scheme, returning it if it existed.
    fn remove_scheme(&self, name: &str) -> Option<AuthenticationScheme>;
}

/// Shared, type-erased scheme provider.
pub type DynSchemeProvider = Arc<dyn SchemeProvider>;

/// Ordered registry of boot-time schemes.
#[derive(Debug, Default)]
pub struct StaticSchemeProvider {
    schemes: RwLock<IndexMap<String, AuthenticationScheme>>,
    default_challenge: Option<String>,
}

impl StaticSchemeProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the scheme returned by `default_challenge_scheme`. Without one,
    /// the first registered scheme is used.
    #[must_use]
    pub fn with_default_challenge(mut self, name: impl Into<String>) -> Self {
        self.default_challenge = Some(name.into());
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, AuthenticationScheme>> {
        self.schemes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, AuthenticationScheme>> {
        self.schemes.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SchemeProvider for StaticSchemeProvider {
    async fn get_scheme(&self, name: &str) -> Result<Option<AuthenticationScheme>, FederationError> {
        Ok(self.read().get(name).cloned())
    }

    async fn get_all_schemes(&self) -> Result<Vec<AuthenticationScheme>, FederationError> {
        Ok(self.read().values().cloned().collect())
    }

    async fn default_challenge_scheme(
        &self,
    ) -> Result<Option<AuthenticationScheme>, FederationError> {
        let schemes = self.read();
        let scheme = match &self.default_challenge {
            Some(name) => schemes.get(name),
            None => schemes.values().next(),
        };
        Ok(scheme.cloned())
    }

    fn add_scheme(&self, scheme: AuthenticationScheme) -> bool {
        let mut schemes = self.write();
        if schemes.contains_key(&scheme.name) {
            return false;
        }
        schemes.insert(scheme.name.clone(), scheme);
        true
    }

    fn remove_scheme(&self, name: &str) -> Option<AuthenticationScheme> {
        self.write().shift_remove(name)
    }
}

/// Scheme provider that consults a base provider, then the store.
///
/// Static schemes win lookups on a name collision. Enumeration lists base
/// schemes first and then one scheme per stored record, without removing
/// duplicates; every entry carries its [`SchemeSource`].
pub struct DynamicSchemeProvider {
    base: DynSchemeProvider,
    store: DynIdentityProviderStore,
}

impl DynamicSchemeProvider {
    #[must_use]
    pub fn new(base: DynSchemeProvider, store: DynIdentityProviderStore) -> Self {
        Self { base, store }
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub fn base(&self) -> &DynSchemeProvider {
        &self.base
    }
}

#[async_trait]
impl SchemeProvider for DynamicSchemeProvider {
    async fn get_scheme(&self, name: &str) -> Result<Option<AuthenticationScheme>, FederationError> {
        if let Some(scheme) = self.base.get_scheme(name).await? {
            return Ok(Some(scheme));
        }

        let record = self.store.find(name).await?;
        Ok(record.as_ref().map(AuthenticationScheme::from_record))
    }

    async fn get_all_schemes(&self) -> Result<Vec<AuthenticationScheme>, FederationError> {
        let mut schemes = self.base.get_all_schemes().await?;

        let mut records = self.store.query().await?;
        records.sort_by(|a, b| a.name.cmp(&b.name));

        for record in &records {
            if schemes
                .iter()
                .any(|s| s.source == SchemeSource::Static && s.name == record.name)
            {
                tracing::warn!(
                    scheme = %record.name,
                    "Dynamic identity provider shadowed by a static scheme of the same name"
                );
            }
            schemes.push(AuthenticationScheme::from_record(record));
        }

        Ok(schemes)
    }

    async fn default_challenge_scheme(
        &self,
    ) -> Result<Option<AuthenticationScheme>, FederationError> {
        self.base.default_challenge_scheme().await
    }

    fn add_scheme(&self, scheme: AuthenticationScheme) -> bool {
        self.base.add_scheme(scheme)
    }

    fn remove_scheme(&self, name: &str) -> Option<AuthenticationScheme> {
        self.base.remove_scheme(name)
    }
}
