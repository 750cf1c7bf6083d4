//! Persisted identity provider configuration.
//!
//! # Example
//!
//! ```ignore
//! use portcullis_auth::federation::IdentityProviderRecord;
//!
//! let record = IdentityProviderRecord::new("okta", "https://okta.example/", "abc")
//!     .with_display_name("Okta")
//!     .with_scopes(vec!["openid", "email"]);
//! ```

use serde::{Deserialize, Serialize};

/// One external OpenID Connect federation partner.
///
/// `name` is the store key and the authentication scheme identifier; it is
/// compared case-sensitively and never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderRecord {
    /// Unique name, also used as the authentication scheme name.
    pub name: String,

    /// Human-readable label shown on login pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Issuer URL of the federation partner.
    #[serde(default)]
    pub authority: String,

    /// Client identifier this server presents to the partner.
    #[serde(default)]
    pub client_id: String,

    /// Confidential client secret, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Local redirect path. Falls back to the handler default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_path: Option<String>,

    /// Requested scopes. Falls back to the provider defaults when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl IdentityProviderRecord {
    /// Creates a record with the fields required at use time.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        authority: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            authority: authority.into(),
            client_id: client_id.into(),
            client_secret: None,
            callback_path: None,
            scopes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the first required field that is missing or blank, using the
    /// wire (camelCase) field names.
    ///
    /// Checked in order: `name`, `authority`, `clientId`.
    #[must_use]
    pub fn missing_required_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("name");
        }
        if self.authority.trim().is_empty() {
            return Some("authority");
        }
        if self.client_id.trim().is_empty() {
            return Some("clientId");
        }
        None
    }

    /// Returns the callback path if one is set and non-blank.
    #[must_use]
    pub fn effective_callback_path(&self) -> Option<&str> {
        self.callback_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Returns the display name, falling back to the name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
