//! Web API router construction and shared response utilities.

use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::trace;

use crate::state::AppState;
use crate::web::years;

/// Cache-Control presets for public endpoints.
pub mod cache {
    /// Year overviews change rarely; let clients and proxies hold them.
    pub const YEAR: &str = "public, max-age=600, s-maxage=3600, stale-while-revalidate=600";
    pub const NONE: &str = "no-store";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router
pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    let api_router = Router::new()
        .route("/health", get(health))
        .route("/v1/years/{year}", get(years::get_year))
        .route("/v1/years/{year}/music", get(years::get_music))
        .route(
            "/v1/years/{year}/entertainment",
            get(years::get_entertainment),
        )
        .route("/v1/years/{year}/events", get(years::get_events))
        .route("/v1/years/{year}/nobel", get(years::get_nobel))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        TraceLayer::new_for_http(),
        CorsLayer::permissive(),
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        timeout_layer(request_timeout),
    ))
}

/// Requests still running after `request_timeout` are answered with `408 Request Timeout`.
fn timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}

/// `GET /api/health`
async fn health() -> Response {
    trace!("health check requested");
    let body: Value = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_SHORT"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });
    with_cache_control(body, cache::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        async fn slow() -> &'static str {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "done"
        }
        let router = Router::new()
            .route("/slow", get(slow))
            .route("/health", get(health))
            .layer(timeout_layer(Duration::from_millis(50)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        let client = reqwest::Client::new();
        let slow = client.get(format!("http://{addr}/slow")).send().await.unwrap();
        assert_eq!(slow.status().as_u16(), StatusCode::REQUEST_TIMEOUT.as_u16());

        let health = client.get(format!("http://{addr}/health")).send().await.unwrap();
        assert_eq!(health.status().as_u16(), 200);
        assert_eq!(health.headers()["cache-control"], cache::NONE);
    }
}
