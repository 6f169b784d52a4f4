//! HTTP surface.
//!
//! | Route | Auth | Response |
//! |-------|------|----------|
//! | `GET /` | none | health string |
//! | `GET /api/key` | `X-API-Key` header or `?apiKey=` | raw key as `text/plain`, or 401 |
//!
//! The key endpoint skips the per-user eligibility policy: the API key
//! identifies a trusted integration, not a community member.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use keyward_core::Disclosure;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub const HEALTH_BODY: &str = "Webserver OK, Discord Bot OK";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    disclosure: Arc<Disclosure>,
}

impl AppState {
    pub fn new(disclosure: Arc<Disclosure>) -> Self {
        Self { disclosure }
    }
}

#[derive(Debug, Default, Deserialize)]
struct KeyQuery {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/key", get(current_key))
        .layer(cors)
        .with_state(state)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> &'static str {
    HEALTH_BODY
}

async fn current_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Option<Query<KeyQuery>>,
) -> Response {
    // Header wins over the query parameter. An unparseable query string
    // carries no credential.
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let credential = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(query.api_key.as_deref());

    match state.disclosure.fetch_programmatic(credential, Utc::now()) {
        Ok(key) => key.into_response(),
        Err(e) => {
            tracing::warn!(credential_present = credential.is_some(), "rejected key request: {e}");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}
