//! Identity Provider Client Tests
//!
//! Runs the reqwest client against a wiremock provider:
//! - Form-encoded code exchange and bearer-authenticated profile fetch
//! - Each failure class maps to its own ProviderError variant

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sso_platform::{IdentityProvider, IdentityProviderClient, ProviderError, ProviderSettings};

const CALLBACK: &str = "https://sso.example.org/oauth/callback";

fn settings(base_url: &str) -> ProviderSettings {
    ProviderSettings {
        base_url: base_url.to_string(),
        token_path: "/oauth/token".to_string(),
        user_path: "/api/user".to_string(),
        client_id: "client-1".to_string(),
        client_secret: "s3cret".to_string(),
        request_timeout: Duration::from_secs(5),
    }
}

fn client(server: &MockServer) -> IdentityProviderClient {
    IdentityProviderClient::new(settings(&server.uri())).unwrap()
}

async fn mount_token(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_resolve_identity_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("client_id=client-1"))
        .and(body_string_contains("client_secret=s3cret"))
        .and(body_string_contains(
            "redirect_uri=https%3A%2F%2Fsso.example.org%2Foauth%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "tok-123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "cid": 1234567,
                "personal": {
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "full_name": "Ada Lovelace"
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = client(&server)
        .resolve_identity("auth-code", CALLBACK)
        .await
        .unwrap();

    assert_eq!(identity.cid, 1234567);
    assert_eq!(identity.last_name, "Lovelace");
    assert_eq!(identity.full_name, "Ada Lovelace");
}

#[tokio::test]
async fn test_token_endpoint_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    // Profile must not be requested after a failed exchange
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve_identity("bad-code", CALLBACK)
        .await
        .unwrap_err();

    match err {
        ProviderError::Status { endpoint, status, body } => {
            assert_eq!(endpoint, "token");
            assert_eq!(status, 401);
            assert_eq!(body, "invalid_grant");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_access_token() {
    let server = MockServer::start().await;
    mount_token(&server, json!({ "access_token": "" })).await;

    let err = client(&server)
        .exchange_code("auth-code", CALLBACK)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::EmptyToken));
}

#[tokio::test]
async fn test_missing_access_token() {
    let server = MockServer::start().await;
    mount_token(&server, json!({ "error": "nope" })).await;

    let err = client(&server)
        .exchange_code("auth-code", CALLBACK)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::EmptyToken));
}

#[tokio::test]
async fn test_undecodable_profile() {
    let server = MockServer::start().await;
    mount_token(&server, json!({ "access_token": "tok" })).await;

    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "x" } })))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve_identity("auth-code", CALLBACK)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Decode { endpoint: "user", .. }));
}

#[tokio::test]
async fn test_profile_endpoint_error_status() {
    let server = MockServer::start().await;
    mount_token(&server, json!({ "access_token": "tok" })).await;

    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve_identity("auth-code", CALLBACK)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Status { endpoint: "user", status: 503, .. }
    ));
}

#[tokio::test]
async fn test_unreachable_provider() {
    // Nothing listens on port 1
    let client = IdentityProviderClient::new(settings("http://127.0.0.1:1")).unwrap();

    let err = client.exchange_code("auth-code", CALLBACK).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport { endpoint: "token", .. }));
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut short = settings(&server.uri());
    short.request_timeout = Duration::from_millis(100);
    let client = IdentityProviderClient::new(short).unwrap();

    let err = client.exchange_code("auth-code", CALLBACK).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport { .. }));
}
