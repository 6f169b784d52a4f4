//! Route tests for the HTTP surface.
//!
//! 1. Health route answers without credentials
//! 2. Correct credential (header or query) returns the raw key
//! 3. Wrong or missing credential returns 401 without the key
//! 4. No configured API key closes the endpoint
//! 5. CORS headers are permissive

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use keyward_bot::http::{router, AppState, HEALTH_BODY};
use keyward_bot::Services;
use keyward_core::{EligibilityConfig, KeyStoreConfig, MemoryStore, SpamConfig};
use tower::ServiceExt;

const API_KEY: &str = "integration-secret";

fn services(api_key: Option<&str>, policy: EligibilityConfig) -> Services {
    Services::with_store(
        Arc::new(MemoryStore::new()),
        KeyStoreConfig::default(),
        policy,
        SpamConfig::disabled(),
        api_key.map(str::to_string),
    )
}

fn app(services: &Services) -> Router {
    router(AppState::new(services.disclosure.clone()))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let services = services(None, EligibilityConfig::default());
    let response = app(&services).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, HEALTH_BODY);
}

#[tokio::test]
async fn test_header_credential_returns_raw_key() {
    let services = services(Some(API_KEY), EligibilityConfig::default());
    let response = app(&services)
        .oneshot(
            Request::builder()
                .uri("/api/key")
                .header("X-API-Key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));

    let body = body_text(response).await;
    assert_eq!(body, services.keys.peek().unwrap().value());
    assert_eq!(body.len(), keyward_core::DEFAULT_KEY_LENGTH);
}

#[tokio::test]
async fn test_query_credential_returns_same_key() {
    let services = services(Some(API_KEY), EligibilityConfig::default());
    let existing = services.keys.current_or_rotate(Utc::now());

    let response = app(&services)
        .oneshot(get(&format!("/api/key?apiKey={API_KEY}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, existing.value());
}

#[tokio::test]
async fn test_endpoint_ignores_member_policy() {
    let strict = EligibilityConfig {
        require_verification: true,
        minimum_qualifying_events: 1000,
    };
    let services = services(Some(API_KEY), strict);
    let response = app(&services)
        .oneshot(get(&format!("/api/key?apiKey={API_KEY}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_or_missing_credential_is_401() {
    let services = services(Some(API_KEY), EligibilityConfig::default());
    let key = services.keys.current_or_rotate(Utc::now());

    for uri in ["/api/key", "/api/key?apiKey=wrong", "/api/key?apiKey="] {
        let response = app(&services).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = body_text(response).await;
        assert_eq!(body, "Unauthorized");
        assert!(!body.contains(key.value()));
    }

    let response = app(&services)
        .oneshot(
            Request::builder()
                .uri("/api/key")
                .header("X-API-Key", "integration-secreT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_query_credential_is_401_not_400() {
    let services = services(Some(API_KEY), EligibilityConfig::default());
    let uri = format!("/api/key?apiKey={API_KEY}&apiKey=other");

    let response = app(&services).oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Unauthorized");
}

#[tokio::test]
async fn test_header_wins_over_malformed_query() {
    let services = services(Some(API_KEY), EligibilityConfig::default());
    let response = app(&services)
        .oneshot(
            Request::builder()
                .uri("/api/key?apiKey=x&apiKey=y")
                .header("X-API-Key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, services.keys.peek().unwrap().value());
}

#[tokio::test]
async fn test_unconfigured_api_key_closes_endpoint() {
    let services = services(None, EligibilityConfig::default());
    let response = app(&services)
        .oneshot(get("/api/key?apiKey="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(services.keys.peek().is_none());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let services = services(Some(API_KEY), EligibilityConfig::default());
    let response = app(&services)
        .oneshot(
            Request::builder()
                .uri(format!("/api/key?apiKey={API_KEY}"))
                .header(header::ORIGIN, "https://example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
