//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/secrets", post(handlers::create_secret))
        .route("/secrets/:id", get(handlers::get_secret))
        .route("/up", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::{TestResponse, TestServer};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use super::middleware::RateLimiter;
    use crate::secret::clock::ManualClock;
    use crate::secret::{SecretEngine, SystemClock};
    use crate::store::MemorySecretStore;

    const BASE: &str = "http://localhost:8080";

    fn server(state: AppState) -> TestServer {
        TestServer::new(build(state)).unwrap()
    }

    /// Split a retrieval URL into its path and single query parameter.
    fn split_url(url: &str) -> (String, String, String) {
        let rest = url.strip_prefix(BASE).unwrap();
        let (path, query) = rest.split_once('?').unwrap();
        let (name, value) = query.split_once('=').unwrap();
        (path.to_owned(), name.to_owned(), value.to_owned())
    }

    async fn create(server: &TestServer, body: Value) -> TestResponse {
        server.post("/secrets").json(&body).await
    }

    #[tokio::test]
    async fn token_secret_is_readable_exactly_once() {
        let server = server(AppState::default());
        let created = create(&server, json!({"password": "hunter2"})).await;
        assert_eq!(created.status_code(), StatusCode::OK);
        let url = created.json::<Value>()["url"].as_str().unwrap().to_owned();
        let (path, name, token) = split_url(&url);
        assert_eq!(name, "token");

        let first = server.get(&path).add_query_param("token", &token).await;
        assert_eq!(first.status_code(), StatusCode::OK);
        let body = first.json::<Value>();
        assert_eq!(body["secret"], "hunter2");
        assert!(body["note"].as_str().unwrap().contains("deleted"));

        let second = server.get(&path).add_query_param("token", &token).await;
        assert_eq!(second.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn passphrase_secret_survives_wrong_guess() {
        let server = server(AppState::default());
        let created = create(
            &server,
            json!({"password": "launch codes", "passphrase": "correct horse"}),
        )
        .await;
        assert_eq!(created.status_code(), StatusCode::OK);
        let body = created.json::<Value>();
        assert!(body["note"].is_string());
        let url = body["url"].as_str().unwrap().to_owned();
        let (path, name, value) = split_url(&url);
        assert_eq!(name, "passphrase");
        assert!(value.is_empty());

        let wrong = server
            .get(&path)
            .add_query_param("passphrase", "battery staple")
            .await;
        assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.json::<Value>()["code"], "invalid_key");

        let right = server
            .get(&path)
            .add_query_param("passphrase", "correct horse")
            .await;
        assert_eq!(right.status_code(), StatusCode::OK);
        assert_eq!(right.json::<Value>()["secret"], "launch codes");
    }

    #[tokio::test]
    async fn expired_secret_is_gone() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = SecretEngine::new(Arc::new(MemorySecretStore::new()), clock.clone(), BASE);
        let server = server(AppState::new(engine, RateLimiter::per_minute(60)));

        let created = create(&server, json!({"password": "x", "expires_in": 5})).await;
        assert_eq!(created.status_code(), StatusCode::OK);
        let url = created.json::<Value>()["url"].as_str().unwrap().to_owned();
        let (path, _, token) = split_url(&url);

        clock.advance(Duration::minutes(6));
        let resp = server.get(&path).add_query_param("token", &token).await;
        assert_eq!(resp.status_code(), StatusCode::GONE);
        assert_eq!(resp.json::<Value>()["code"], "expired");
    }

    #[tokio::test]
    async fn ttl_above_one_day_is_rejected() {
        let server = server(AppState::default());
        let resp = create(&server, json!({"password": "x", "expires_in": 1441})).await;
        assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = resp.json::<Value>();
        assert!(body["errors"]["expires_in"].is_array());
        assert!(body["errors"].get("password").is_none());
    }

    #[tokio::test]
    async fn both_keys_is_bad_request() {
        let server = server(AppState::default());
        let resp = server
            .get("/secrets/anything")
            .add_query_param("token", "abc")
            .add_query_param("passphrase", "p1")
            .await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<Value>()["code"], "ambiguous_key");
    }

    #[tokio::test]
    async fn no_key_is_unprocessable() {
        let server = server(AppState::default());
        let resp = server.get("/secrets/anything").await;
        assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = server(AppState::default());
        let resp = server.get("/unknown").await;
        assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(resp.json::<Value>()["code"], "not_found");
    }

    #[tokio::test]
    async fn health_route_exists() {
        let server = server(AppState::default());
        let resp = server.get("/up").await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.headers()["x-ratelimit-limit"], "60");
    }

    #[tokio::test]
    async fn rate_limit_rejects_with_retry_after() {
        let engine = SecretEngine::new(
            Arc::new(MemorySecretStore::new()),
            Arc::new(SystemClock),
            BASE,
        );
        let server = server(AppState::new(engine, RateLimiter::per_minute(2)));

        let first = server.get("/up").await;
        assert_eq!(first.headers()["x-ratelimit-remaining"], "1");
        let second = server.get("/up").await;
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");

        let third = server.get("/up").await;
        assert_eq!(third.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(third.headers()["x-ratelimit-limit"], "2");
        assert!(third.headers().contains_key("retry-after"));
        assert_eq!(third.json::<Value>()["code"], "too_many_requests");
    }
}
