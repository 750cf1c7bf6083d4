//! Shared helpers for the server integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use portcullis_auth::federation::MemoryIdentityProviderStore;
use portcullis_server::bootstrap::build_state_with_store;
use portcullis_server::build_app;
use portcullis_server::config::AppConfig;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// Configuration that accepts plain-HTTP authorities, so wiremock can stand
/// in for a partner.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.federation.allow_http = true;
    config
}

pub async fn start_server(mut config: AppConfig) -> TestServer {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    config.server.base_url = Some(format!("http://{addr}"));

    let store = Arc::new(MemoryIdentityProviderStore::new());
    let state = build_state_with_store(&config, store).expect("build state");
    let app = build_app(state, config.server.body_limit_bytes);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestServer {
        base: format!("http://{addr}"),
        client,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

pub fn discovery_document(issuer: &str) -> Value {
    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "jwks_uri": format!("{issuer}/jwks"),
        "response_types_supported": ["code"],
    })
}

/// Starts a mock partner that serves its discovery document.
pub async fn mock_partner() -> MockServer {
    let partner = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discovery_document(&partner.uri())))
        .mount(&partner)
        .await;
    partner
}

pub fn provider(name: &str, authority: &str) -> Value {
    json!({
        "name": name,
        "displayName": format!("{name} login"),
        "authority": authority,
        "clientId": format!("{name}-client"),
        "clientSecret": "s3cret",
    })
}
