//! Admin API behavior over a real listener.

mod common;

use common::{provider, start_server, test_config};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn healthz_reports_ok() {
    let server = start_server(test_config()).await;

    let res = server.client.get(server.url("/healthz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));

    server.stop().await;
}

#[tokio::test]
async fn create_read_list_delete_round_trip() {
    let server = start_server(test_config()).await;

    let res = server
        .client
        .post(server.url("/api/providers"))
        .json(&provider("okta", "https://okta.example"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        res.headers()["location"].to_str().unwrap(),
        server.url("/api/providers/okta")
    );
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["name"], "okta");
    assert_eq!(created["clientId"], "okta-client");
    assert_eq!(created["hasClientSecret"], true);
    assert!(created.get("clientSecret").is_none());

    let res = server
        .client
        .get(server.url("/api/providers/okta"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let read: Value = res.json().await.unwrap();
    assert_eq!(read, created);

    let page: Value = server
        .client
        .get(server.url("/api/providers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["start"], 0);
    assert_eq!(page["totalSize"], 1);
    assert_eq!(page["resources"][0]["name"], "okta");
    assert_eq!(page["resources"][0]["url"], server.url("/api/providers/okta"));

    let res = server
        .client
        .delete(server.url("/api/providers/okta"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .get(server.url("/api/providers/okta"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Identity provider 'okta' not found");

    // Deleting again still succeeds.
    let res = server
        .client
        .delete(server.url("/api/providers/okta"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let server = start_server(test_config()).await;

    let cases = [
        (
            json!({ "authority": "https://a.example", "clientId": "c" }),
            "Cannot create an identity provider without a name",
        ),
        (
            json!({ "name": "a", "clientId": "c" }),
            "Cannot create an identity provider without an authority",
        ),
        (
            json!({ "name": "a", "authority": "https://a.example", "clientId": "  " }),
            "Cannot create an identity provider without a client ID",
        ),
    ];

    for (body, message) in cases {
        let res = server
            .client
            .post(server.url("/api/providers"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], message);
    }

    let page: Value = server
        .client
        .get(server.url("/api/providers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["totalSize"], 0);

    server.stop().await;
}

#[tokio::test]
async fn create_rejects_unusable_configuration() {
    let server = start_server(test_config()).await;

    let res = server
        .client
        .post(server.url("/api/providers"))
        .json(&provider("bad", "not a url"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/api/providers"))
        .json(&json!({
            "name": "noopenid",
            "authority": "https://a.example",
            "clientId": "c",
            "scopes": ["email"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn https_is_required_unless_allowed() {
    let server = start_server(Default::default()).await;

    let res = server
        .client
        .post(server.url("/api/providers"))
        .json(&provider("plain", "http://plain.example"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let server = start_server(test_config()).await;

    let first = server
        .client
        .post(server.url("/api/providers"))
        .json(&provider("okta", "https://okta.example"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = server
        .client
        .post(server.url("/api/providers"))
        .json(&provider("okta", "https://other.example"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["message"], "Identity provider 'okta' already exists");

    let read: Value = server
        .client
        .get(server.url("/api/providers/okta"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["authority"], "https://okta.example");

    server.stop().await;
}

#[tokio::test]
async fn list_filters_and_pages() {
    let server = start_server(test_config()).await;

    for name in ["okta-eu", "Okta-us", "azure", "auth0", "okta-apac"] {
        let res = server
            .client
            .post(server.url("/api/providers"))
            .json(&provider(name, "https://idp.example"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let page: Value = server
        .client
        .get(server.url("/api/providers?name=okta&skip=1&take=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["start"], 1);
    assert_eq!(page["totalSize"], 3);
    let names: Vec<_> = page["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["okta-apac"]);

    let page: Value = server
        .client
        .get(server.url("/api/providers?skip=-5&take=500"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["start"], 0);
    assert_eq!(page["totalSize"], 5);
    assert_eq!(page["resources"].as_array().unwrap().len(), 5);

    let res = server
        .client
        .head(server.url("/api/providers"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn blank_or_malformed_paging_uses_defaults() {
    let server = start_server(test_config()).await;

    for i in 0..25 {
        let res = server
            .client
            .post(server.url("/api/providers"))
            .json(&provider(&format!("idp-{i:02}"), "https://idp.example"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    for query in ["?name=&skip=&take=", "?skip=abc&take=abc"] {
        let res = server
            .client
            .get(server.url(&format!("/api/providers{query}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "query {query}");
        let page: Value = res.json().await.unwrap();
        assert_eq!(page["start"], 0);
        assert_eq!(page["totalSize"], 25);
        assert_eq!(page["resources"].as_array().unwrap().len(), 20);
        assert_eq!(page["resources"][0]["name"], "idp-00");
    }

    server.stop().await;
}

#[tokio::test]
async fn admin_token_is_enforced() {
    let mut config = test_config();
    config.admin.api_token = Some("letmein".into());
    let server = start_server(config).await;

    let res = server
        .client
        .get(server.url("/api/providers"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Admin token required");

    let res = server
        .client
        .get(server.url("/api/providers"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid admin token");

    let res = server
        .client
        .get(server.url("/api/providers"))
        .bearer_auth("letmein")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Login and health stay public.
    let res = server.client.get(server.url("/healthz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
}
