//! OpenID Connect relying-party handler.
//!
//! The handler covers what the resolver needs from a protocol handler:
//! discovery during initialization and building the authorization redirect.
//! Code exchange and token validation are not implemented here.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::discovery::DiscoveryClient;
use super::error::FederationError;
use super::handler::{AuthenticationHandler, DynHandler, HandlerFactory, RequestContext};
use super::monitor::OptionsMonitor;
use super::options::OidcOptions;
use super::scheme::AuthenticationScheme;

/// Provider metadata from `.well-known/openid-configuration`.
///
/// Only the fields used by this crate are modelled; unknown fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcDiscoveryDocument {
    pub issuer: String,

    pub authorization_endpoint: String,

    pub token_endpoint: String,

    pub jwks_uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    #[serde(default)]
    pub response_types_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
}

impl OidcDiscoveryDocument {
    /// Returns `true` if the partner advertises `response_type`.
    ///
    /// An empty list is treated as "anything goes".
    #[must_use]
    pub fn supports_response_type(&self, response_type: &str) -> bool {
        self.response_types_supported.is_empty()
            || self.response_types_supported.iter().any(|r| r == response_type)
    }
}

#[derive(Debug)]
struct Initialized {
    scheme: AuthenticationScheme,
    document: OidcDiscoveryDocument,
}

/// OpenID Connect handler bound to an options monitor.
pub struct OidcHandler {
    options: Arc<dyn OptionsMonitor<OidcOptions>>,
    discovery: DiscoveryClient,
    state: OnceLock<Initialized>,
}

impl OidcHandler {
    #[must_use]
    pub fn new(options: Arc<dyn OptionsMonitor<OidcOptions>>, discovery: DiscoveryClient) -> Self {
        Self {
            options,
            discovery,
            state: OnceLock::new(),
        }
    }

    /// Returns the discovery document once initialized.
    #[must_use]
    pub fn discovery_document(&self) -> Option<&OidcDiscoveryDocument> {
        self.state.get().map(|s| &s.document)
    }

    fn options_for(&self, scheme: &AuthenticationScheme) -> Arc<OidcOptions> {
        self.options.get(&scheme.name)
    }
}

#[async_trait]
impl AuthenticationHandler for OidcHandler {
    fn scheme(&self) -> Option<AuthenticationScheme> {
        self.state.get().map(|s| s.scheme.clone())
    }

    async fn initialize(
        &self,
        scheme: &AuthenticationScheme,
        _ctx: &RequestContext,
    ) -> Result<(), FederationError> {
        if self.state.get().is_some() {
            return Ok(());
        }

        let options = self.options_for(scheme);
        let document = self
            .discovery
            .discover(&options)
            .await
            .map_err(|e| FederationError::initialization(&scheme.name, e))?;

        if !document.supports_response_type(&options.response_type) {
            return Err(FederationError::initialization(
                &scheme.name,
                format!(
                    "partner does not support response type '{}'",
                    options.response_type
                ),
            ));
        }

        // A concurrent initializer may have won; either document is valid.
        let _ = self.state.set(Initialized {
            scheme: scheme.clone(),
            document,
        });
        Ok(())
    }

    fn challenge(
        &self,
        ctx: &RequestContext,
        state: &str,
        nonce: &str,
    ) -> Result<Url, FederationError> {
        let Some(initialized) = self.state.get() else {
            return Err(FederationError::initialization(
                "<unbound>",
                "handler used before initialization",
            ));
        };
        let scheme = &initialized.scheme.name;
        let options = self.options_for(&initialized.scheme);

        let redirect_uri = callback_url(&ctx.base_url, &options.callback_path)
            .ok_or_else(|| {
                FederationError::initialization(scheme, "base URL cannot carry a path")
            })?;

        let mut url = Url::parse(&initialized.document.authorization_endpoint)
            .map_err(|e| FederationError::initialization(scheme, e))?;
        url.query_pairs_mut()
            .append_pair("response_type", &options.response_type)
            .append_pair("client_id", &options.client_id)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("scope", &options.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("nonce", nonce);

        Ok(url)
    }
}

/// Appends `callback_path` to the base URL's path, keeping any prefix the
/// server is mounted under.
fn callback_url(base_url: &Url, callback_path: &str) -> Option<Url> {
    let mut url = base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(callback_path.split('/').filter(|s| !s.is_empty()));
    Some(url)
}

/// Creates [`OidcHandler`]s sharing one discovery client.
#[derive(Debug, Clone, Default)]
pub struct OidcHandlerFactory {
    discovery: DiscoveryClient,
}

impl OidcHandlerFactory {
    #[must_use]
    pub fn new(discovery: DiscoveryClient) -> Self {
        Self { discovery }
    }
}

impl HandlerFactory for OidcHandlerFactory {
    fn create(
        &self,
        _scheme: &AuthenticationScheme,
        options: Arc<dyn OptionsMonitor<OidcOptions>>,
    ) -> DynHandler {
        Arc::new(OidcHandler::new(options, self.discovery.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::monitor::StaticOptionsMonitor;
    use crate::federation::scheme::HandlerKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn partner() -> MockServer {
        let server = MockServer::start().await;
        let issuer = server.uri();
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{issuer}/authorize"),
                "token_endpoint": format!("{issuer}/token"),
                "jwks_uri": format!("{issuer}/jwks"),
                "response_types_supported": ["code", "id_token"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn handler(authority: &str) -> DynHandler {
        let options = OidcOptions {
            authority: authority.to_string(),
            client_id: "abc".into(),
            callback_path: "/signin-okta".into(),
            scopes: vec!["openid".into(), "email".into()],
            require_https_metadata: false,
            ..Default::default()
        };
        let scheme = AuthenticationScheme::new("okta", HandlerKind::OpenIdConnect);
        OidcHandlerFactory::default().create(&scheme, Arc::new(StaticOptionsMonitor::new(options)))
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Url::parse("https://portcullis.example/").unwrap())
    }

    #[test]
    fn test_document_parsing_ignores_unknown_fields() {
        let json = r#"{
            "issuer": "https://okta.example",
            "authorization_endpoint": "https://okta.example/authorize",
            "token_endpoint": "https://okta.example/token",
            "jwks_uri": "https://okta.example/jwks",
            "claims_supported": ["sub"]
        }"#;
        let doc: OidcDiscoveryDocument = serde_json::from_str(json).unwrap();
        assert!(doc.supports_response_type("code"));
        assert!(doc.userinfo_endpoint.is_none());
    }

    #[tokio::test]
    async fn test_initialize_then_challenge() {
        let server = partner().await;
        let handler = handler(&server.uri());
        let scheme = AuthenticationScheme::from_record(
            &crate::federation::IdentityProviderRecord::new("okta", server.uri(), "abc"),
        );

        handler.initialize(&scheme, &ctx()).await.unwrap();
        handler.initialize(&scheme, &ctx()).await.unwrap();
        assert_eq!(handler.scheme().unwrap().name, "okta");

        let url = handler.challenge(&ctx(), "st", "nc").unwrap();
        assert!(url.as_str().starts_with(&format!("{}/authorize?", server.uri())));

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "abc");
        assert_eq!(pairs["redirect_uri"], "https://portcullis.example/signin-okta");
        assert_eq!(pairs["scope"], "openid email");
        assert_eq!(pairs["state"], "st");
        assert_eq!(pairs["nonce"], "nc");
    }

    #[test]
    fn test_callback_url_keeps_base_path() {
        let url = |base: &str, path: &str| {
            callback_url(&Url::parse(base).unwrap(), path)
                .unwrap()
                .to_string()
        };

        assert_eq!(
            url("https://portcullis.example", "/signin-oidc"),
            "https://portcullis.example/signin-oidc"
        );
        assert_eq!(
            url("https://host.example/auth", "/signin-oidc"),
            "https://host.example/auth/signin-oidc"
        );
        assert_eq!(
            url("https://host.example/auth/?x=1", "/cb/okta"),
            "https://host.example/auth/cb/okta"
        );
        assert!(callback_url(&Url::parse("data:text/plain,hi").unwrap(), "/cb").is_none());
    }

    #[tokio::test]
    async fn test_challenge_under_path_prefix() {
        let server = partner().await;
        let handler = handler(&server.uri());
        let scheme = AuthenticationScheme::new("okta", HandlerKind::OpenIdConnect);
        handler.initialize(&scheme, &ctx()).await.unwrap();

        let prefixed = RequestContext::new(Url::parse("https://host.example/auth").unwrap());
        let url = handler.challenge(&prefixed, "st", "nc").unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["redirect_uri"], "https://host.example/auth/signin-okta");
    }

    #[tokio::test]
    async fn test_challenge_before_initialize_fails() {
        let handler = handler("https://okta.example/");
        assert!(handler.challenge(&ctx(), "st", "nc").is_err());
        assert!(handler.scheme().is_none());
    }

    #[tokio::test]
    async fn test_initialize_surfaces_discovery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let handler = handler(&server.uri());
        let scheme = AuthenticationScheme::new("okta", HandlerKind::OpenIdConnect);
        let err = handler.initialize(&scheme, &ctx()).await.unwrap_err();

        assert!(matches!(err, FederationError::Initialization { .. }));
        assert!(err.to_string().contains("status 404"));
    }
}
