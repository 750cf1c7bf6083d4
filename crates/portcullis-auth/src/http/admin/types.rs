//! Admin API types.
//!
//! Request and response bodies for the identity provider administration
//! endpoints, plus the in-process filtering and pagination they rely on.

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::federation::IdentityProviderRecord;

/// Page size used when `take` is omitted.
pub const DEFAULT_TAKE: usize = 20;

/// Largest page size a caller may request.
pub const MAX_TAKE: usize = 100;

// =============================================================================
// Search Parameters
// =============================================================================

/// Query parameters for listing identity providers.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProviderSearchParams {
    /// Case-insensitive name prefix.
    pub name: Option<String>,

    /// Number of results to skip. Negative values count as zero.
    #[serde(default, deserialize_with = "lenient_integer")]
    pub skip: Option<i64>,

    /// Maximum number of results. Clamped to `0..=100`, default 20.
    #[serde(default, deserialize_with = "lenient_integer")]
    pub take: Option<i64>,
}

/// Reads a query-string integer; blank or non-numeric values count as
/// absent.
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl ProviderSearchParams {
    #[must_use]
    pub fn skip(&self) -> usize {
        self.skip.map_or(0, |s| usize::try_from(s).unwrap_or(0))
    }

    #[must_use]
    pub fn take(&self) -> usize {
        match self.take {
            None => DEFAULT_TAKE,
            Some(t) => usize::try_from(t).unwrap_or(0).min(MAX_TAKE),
        }
    }

    fn matches(&self, record: &IdentityProviderRecord) -> bool {
        match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            None => true,
            Some(prefix) => record
                .name
                .to_lowercase()
                .starts_with(&prefix.to_lowercase()),
        }
    }

    /// Filters `records` by name prefix, sorts them by name and cuts out the
    /// requested page.
    #[must_use]
    pub fn apply(&self, records: Vec<IdentityProviderRecord>) -> Page<IdentityProviderRecord> {
        let mut matching: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        let total_size = matching.len();
        let start = self.skip();
        let resources = matching.into_iter().skip(start).take(self.take()).collect();

        Page {
            start,
            total_size,
            resources,
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Request body for registering an identity provider.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderRequest {
    #[serde(default)]
    pub name: String,

    pub display_name: Option<String>,

    #[serde(default)]
    pub authority: String,

    #[serde(default)]
    pub client_id: String,

    pub client_secret: Option<String>,

    pub callback_path: Option<String>,

    #[serde(default)]
    pub scopes: Vec<String>,
}

impl CreateProviderRequest {
    /// Converts the request into a record, trimming the key fields.
    #[must_use]
    pub fn into_record(self) -> IdentityProviderRecord {
        IdentityProviderRecord {
            name: self.name.trim().to_string(),
            display_name: self.display_name,
            authority: self.authority.trim().to_string(),
            client_id: self.client_id.trim().to_string(),
            client_secret: self.client_secret,
            callback_path: self.callback_path,
            scopes: self.scopes,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// A page of results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Offset of the first returned item.
    pub start: usize,

    /// Number of matching items before pagination.
    pub total_size: usize,

    pub resources: Vec<T>,
}

impl<T> Page<T> {
    /// Converts every item, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            start: self.start,
            total_size: self.total_size,
            resources: self.resources.into_iter().map(f).collect(),
        }
    }
}

/// List entry for an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub authority: String,
    pub client_id: String,
    /// Location of the full resource.
    pub url: String,
}

impl ProviderSummary {
    #[must_use]
    pub fn new(record: IdentityProviderRecord, base_url: &Url) -> Self {
        Self {
            url: provider_location(base_url, &record.name),
            name: record.name,
            display_name: record.display_name,
            authority: record.authority,
            client_id: record.client_id,
        }
    }
}

/// Full view of an identity provider. The client secret is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResource {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub authority: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    pub has_client_secret: bool,
}

impl From<IdentityProviderRecord> for ProviderResource {
    fn from(record: IdentityProviderRecord) -> Self {
        Self {
            has_client_secret: record.client_secret.is_some(),
            name: record.name,
            display_name: record.display_name,
            authority: record.authority,
            client_id: record.client_id,
            callback_path: record.callback_path,
            scopes: record.scopes,
        }
    }
}

/// Returns `{base_url}/api/providers/{name}` with `name` percent-encoded.
#[must_use]
pub fn provider_location(base_url: &Url, name: &str) -> String {
    let mut url = base_url.clone();
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().extend(["api", "providers", name]);
        }
        Err(()) => {
            return format!(
                "{}/api/providers/{}",
                base_url.as_str().trim_end_matches('/'),
                name
            );
        }
    }
    url.to_string()
}
