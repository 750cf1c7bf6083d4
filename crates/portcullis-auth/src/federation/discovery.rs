//! OpenID Connect discovery client.
//!
//! Fetches `{authority}/.well-known/openid-configuration` and checks that the
//! returned issuer matches the authority it was fetched from.
//!
//! # Security Considerations
//!
//! - Plain HTTP authorities are refused unless the options relax
//!   `require_https_metadata`
//! - Responses larger than `max_metadata_bytes` are rejected
//! - Every request is bounded by `metadata_timeout`

use url::Url;

use super::oidc::OidcDiscoveryDocument;
use super::options::OidcOptions;

/// Errors that can occur while fetching a discovery document.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: status {0}")]
    Http(u16),

    #[error("Failed to parse discovery document: {0}")]
    Parse(String),

    #[error("Invalid issuer URL: {0}")]
    InvalidIssuer(String),

    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("Invalid URL scheme: {0} (only HTTPS is allowed)")]
    InvalidScheme(String),

    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge { max_size: usize },
}

impl DiscoveryError {
    /// Returns `true` for failures that may clear up on their own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http(status) => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Fetches discovery documents over a shared HTTP connection pool.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryClient {
    http_client: reqwest::Client,
}

impl DiscoveryClient {
    /// Creates a client over an existing `reqwest` client.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Fetches and validates the discovery document for `options.authority`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The authority is not HTTPS and `require_https_metadata` is set
    /// - The document cannot be fetched within `metadata_timeout`
    /// - The response is not a success or is larger than `max_metadata_bytes`
    /// - The document cannot be parsed
    /// - The document's issuer does not match the authority
    pub async fn discover(
        &self,
        options: &OidcOptions,
    ) -> Result<OidcDiscoveryDocument, DiscoveryError> {
        let issuer = Url::parse(options.authority.trim())
            .map_err(|e| DiscoveryError::InvalidIssuer(format!("{}: {}", options.authority, e)))?;

        validate_scheme(&issuer, options.require_https_metadata)?;
        let discovery_url = build_discovery_url(&issuer);

        let response = self
            .http_client
            .get(discovery_url.as_str())
            .header("Accept", "application/json")
            .timeout(options.metadata_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(authority = %issuer, error = %e, "Failed to fetch OIDC discovery");
                DiscoveryError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Http(response.status().as_u16()));
        }

        let max_size = options.max_metadata_bytes;
        if let Some(len) = response.content_length()
            && len > max_size as u64
        {
            return Err(DiscoveryError::ResponseTooLarge { max_size });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;
        if body.len() > max_size {
            return Err(DiscoveryError::ResponseTooLarge { max_size });
        }

        let document: OidcDiscoveryDocument = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(authority = %issuer, error = %e, "Failed to parse OIDC discovery document");
            DiscoveryError::Parse(e.to_string())
        })?;

        validate_issuer(&document, &issuer)?;

        tracing::debug!(issuer = %document.issuer, "Discovered OIDC configuration");
        Ok(document)
    }
}

fn validate_scheme(issuer: &Url, require_https: bool) -> Result<(), DiscoveryError> {
    match issuer.scheme() {
        "https" => Ok(()),
        "http" if !require_https => Ok(()),
        other => Err(DiscoveryError::InvalidScheme(other.to_string())),
    }
}

fn build_discovery_url(issuer: &Url) -> Url {
    let mut url = issuer.clone();
    let path = issuer.path().trim_end_matches('/');
    url.set_path(&format!("{}/.well-known/openid-configuration", path));
    url.set_query(None);
    url
}

/// The issuer in the document must equal the authority, ignoring a
/// trailing slash.
fn validate_issuer(document: &OidcDiscoveryDocument, expected: &Url) -> Result<(), DiscoveryError> {
    let actual = Url::parse(&document.issuer)
        .map_err(|e| DiscoveryError::InvalidIssuer(format!("{}: {}", document.issuer, e)))?;

    let expected = expected.as_str().trim_end_matches('/');
    let actual = actual.as_str().trim_end_matches('/');
    if expected != actual {
        return Err(DiscoveryError::IssuerMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document(issuer: &str) -> serde_json::Value {
        serde_json::json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token"),
            "jwks_uri": format!("{issuer}/jwks"),
            "response_types_supported": ["code"]
        })
    }

    fn options(authority: &str) -> OidcOptions {
        OidcOptions {
            authority: authority.to_string(),
            client_id: "abc".into(),
            require_https_metadata: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_discovery_url() {
        let url = build_discovery_url(&Url::parse("https://okta.example/").unwrap());
        assert_eq!(url.as_str(), "https://okta.example/.well-known/openid-configuration");

        let url = build_discovery_url(&Url::parse("https://login.example/tenant/v2.0").unwrap());
        assert_eq!(
            url.as_str(),
            "https://login.example/tenant/v2.0/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_validate_scheme() {
        let http = Url::parse("http://okta.example/").unwrap();
        assert!(validate_scheme(&http, false).is_ok());
        assert!(matches!(
            validate_scheme(&http, true),
            Err(DiscoveryError::InvalidScheme(_))
        ));
        assert!(validate_scheme(&Url::parse("https://okta.example/").unwrap(), true).is_ok());
    }

    #[test]
    fn test_transient_errors() {
        assert!(DiscoveryError::Network("reset".into()).is_transient());
        assert!(DiscoveryError::Http(503).is_transient());
        assert!(!DiscoveryError::Http(404).is_transient());
        assert!(!DiscoveryError::InvalidScheme("ftp".into()).is_transient());
    }

    #[tokio::test]
    async fn test_discover_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let doc = DiscoveryClient::default()
            .discover(&options(&server.uri()))
            .await
            .unwrap();

        assert_eq!(doc.authorization_endpoint, format!("{}/authorize", server.uri()));
    }

    #[tokio::test]
    async fn test_discover_issuer_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(document("https://evil.example")),
            )
            .mount(&server)
            .await;

        let err = DiscoveryClient::default()
            .discover(&options(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::IssuerMismatch { .. }));
    }

    #[tokio::test]
    async fn test_discover_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = DiscoveryClient::default()
            .discover(&options(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::Http(500)));
    }

    #[tokio::test]
    async fn test_discover_response_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document(&server.uri())))
            .mount(&server)
            .await;

        let mut opts = options(&server.uri());
        opts.max_metadata_bytes = 16;
        let err = DiscoveryClient::default().discover(&opts).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::ResponseTooLarge { max_size: 16 }));
    }

    #[tokio::test]
    async fn test_discover_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(document(&server.uri()))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut opts = options(&server.uri());
        opts.metadata_timeout = Duration::from_millis(100);
        let err = DiscoveryClient::default().discover(&opts).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Network(_)));
    }

    #[tokio::test]
    async fn test_discover_rejects_http_when_https_required() {
        let mut opts = options("http://okta.example/");
        opts.require_https_metadata = true;

        let err = DiscoveryClient::default().discover(&opts).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidScheme(_)));
    }
}
