//! Integration tests for the HTTP authentication client

#![cfg(not(target_arch = "wasm32"))]

use serde_json::{Value, json};
use std::sync::Arc;
use talent_session::{
    ApiError, AuthApi, CredentialStore, HttpAuthApi, LoginCredentials, MemoryStore, Obfuscator,
    UserProfile,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store() -> CredentialStore {
    CredentialStore::new(
        Arc::new(MemoryStore::new()),
        "auth_state",
        Obfuscator::new("test-secret").unwrap(),
    )
}

fn ada() -> UserProfile {
    serde_json::from_value(json!({"name": "Ada", "role": "admin"})).unwrap()
}

fn auth_body(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": {"name": "Ada", "email": "ada@example.com", "role": ["user", "admin"]}
    })
}

#[tokio::test]
async fn test_builder_requires_base_url() {
    let result = HttpAuthApi::builder().build();
    assert!(matches!(result, Err(ApiError::Configuration(_))));
}

#[tokio::test]
async fn test_builder_trims_trailing_slash() {
    let api = HttpAuthApi::new("http://localhost:8000/api/").unwrap();
    assert_eq!(api.base_url(), "http://localhost:8000/api");
}

#[tokio::test]
async fn test_request_otp_posts_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otp/request"))
        .and(body_json(json!({"email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpAuthApi::new(server.uri()).unwrap();
    api.request_otp("ada@example.com").await.unwrap();
}

#[tokio::test]
async fn test_verify_otp_decodes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otp/verify"))
        .and(body_json(json!({"email": "ada@example.com", "otp": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok123", "ref456")))
        .mount(&server)
        .await;

    let api = HttpAuthApi::new(server.uri()).unwrap();
    let response = api.verify_otp("ada@example.com", "123456").await.unwrap();
    assert_eq!(response.access_token, "tok123");
    assert_eq!(response.refresh_token, "ref456");
    assert_eq!(response.user.display_name(), Some("Ada"));
}

#[tokio::test]
async fn test_login_error_message_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let api = HttpAuthApi::new(server.uri()).unwrap();
    let credentials = LoginCredentials {
        email: "ada@example.com".to_string(),
        password: "wrong".to_string(),
    };
    let err = api.login(&credentials).await.unwrap_err();
    match err {
        ApiError::AuthenticationFailed(message) => assert_eq!(message, "Invalid credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_access_token_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otp/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("", "ref456")))
        .mount(&server)
        .await;

    let api = HttpAuthApi::new(server.uri()).unwrap();
    let err = api.verify_otp("ada@example.com", "123456").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_logout_sends_bearer_and_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("authorization", "Bearer tok123"))
        .and(body_json(json!({"refreshToken": "ref456"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store();
    store.save(&ada(), "tok123", Some("ref456")).unwrap();
    let api = HttpAuthApi::builder()
        .base_url(server.uri())
        .credential_store(store)
        .build()
        .unwrap();

    api.logout("ref456").await.unwrap();
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .and(body_json(json!({"refreshToken": "ref456"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "fresh", "refreshToken": "ref789"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store();
    store.save(&ada(), "stale", Some("ref456")).unwrap();
    let api = HttpAuthApi::builder()
        .base_url(server.uri())
        .credential_store(store.clone())
        .build()
        .unwrap();

    api.logout("ref456").await.unwrap();

    // Rotated tokens are persisted and the user is kept
    let stored = store.load().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("ref789"));
    assert_eq!(stored.user, Some(ada()));
}

#[tokio::test]
async fn test_failed_refresh_returns_original_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh revoked"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store();
    store.save(&ada(), "stale", Some("ref456")).unwrap();
    let api = HttpAuthApi::builder()
        .base_url(server.uri())
        .credential_store(store.clone())
        .build()
        .unwrap();

    let err = api.logout("ref456").await.unwrap_err();
    match err {
        ApiError::AuthenticationFailed(message) => assert_eq!(message, "Token expired"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.access_token().as_deref(), Some("stale"));
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = store();
    store.save(&ada(), "stale", None).unwrap();
    let api = HttpAuthApi::builder()
        .base_url(server.uri())
        .credential_store(store)
        .build()
        .unwrap();

    let err = api.logout("ref456").await.unwrap_err();
    assert!(err.is_unauthorized());
}
