//! Axum request handlers for all service endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ots_common::{
    protocol::{
        CreateSecretResponse, ErrorResponse, HealthResponse, RetrieveSecretQuery,
        RetrieveSecretResponse,
    },
    FieldErrors, ServiceError,
};
use serde_json::Value;
use tracing::{error, warn};

use super::state::AppState;
use crate::secret::{validation::parse_create, DELETED_NOTE};

/// `POST /secrets`: encrypt and store a secret, returning its one-time URL.
///
/// Malformed or non-JSON bodies are reported as a validation failure on the
/// `body` field; a field of the wrong type is reported under its own name.
pub async fn create_secret(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(body)) => match parse_create(body) {
            Ok(req) => req,
            Err(errors) => return error_response(&ServiceError::Validation(errors)),
        },
        Err(rejection) => return rejected("body", rejection.body_text()),
    };

    match state.engine.create(req).await {
        Ok(created) => {
            let body = CreateSecretResponse {
                note: created.note().map(str::to_owned),
                url: created.url,
                expires_at: created.expires_at,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// `GET /secrets/{id}`: decrypt and destroy a secret.
///
/// Exactly one of `token` or `passphrase` must be given in the query string.
pub async fn get_secret(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<RetrieveSecretQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return rejected("query", rejection.body_text()),
    };

    match state.engine.retrieve(&id, query).await {
        Ok(revealed) => {
            let body = RetrieveSecretResponse {
                secret: revealed.secret,
                note: DELETED_NOTE.into(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// `GET /up`: liveness check.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Render a [`ServiceError`] as its status code and standard error body.
pub fn error_response(err: &ServiceError) -> Response {
    match err {
        ServiceError::Internal(detail) => error!(error = %detail, "request failed"),
        ServiceError::InvalidKey => warn!("decryption rejected supplied key"),
        _ => {}
    }
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}

fn rejected(field: &str, detail: String) -> Response {
    let mut errors = FieldErrors::new();
    errors.add(field, detail);
    error_response(&ServiceError::Validation(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/secrets", post(create_secret))
            .route("/secrets/:id", get(get_secret))
            .route("/up", get(health))
            .with_state(AppState::default())
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/secrets")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let req = Request::builder().uri("/up").body(Body::empty()).unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn create_returns_token_url() {
        let resp = test_router()
            .oneshot(post_json(r#"{"password":"hunter2"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("http://localhost:8080/secrets/"));
        assert!(url.contains("?token="));
        assert!(body["expires_at"].is_string());
        assert!(body.get("note").is_none());
    }

    #[tokio::test]
    async fn create_with_passphrase_includes_note() {
        let resp = test_router()
            .oneshot(post_json(r#"{"password":"hunter2","passphrase":"p1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["url"].as_str().unwrap().ends_with("?passphrase="));
        assert!(body["note"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let resp = test_router()
            .oneshot(post_json(r#"{"password": "#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "validation_failed");
        assert!(body["errors"]["body"].is_array());
    }

    #[tokio::test]
    async fn wrongly_typed_ttl_names_the_field() {
        let resp = test_router()
            .oneshot(post_json(r#"{"password":"x","expires_in":"ten"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert!(body["errors"]["expires_in"].is_array());
        assert!(body["errors"].get("body").is_none());
    }

    #[tokio::test]
    async fn missing_password_names_the_field() {
        let resp = test_router().oneshot(post_json("{}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert!(body["errors"]["password"].is_array());
    }

    #[tokio::test]
    async fn retrieve_unknown_id_is_not_found() {
        let req = Request::builder()
            .uri("/secrets/does-not-exist?token=abc")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn retrieve_with_both_keys_is_bad_request() {
        let req = Request::builder()
            .uri("/secrets/any?token=abc&passphrase=p1")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert!(body["errors"]["token"].is_array());
        assert!(body["errors"]["passphrase"].is_array());
    }

    #[test]
    fn internal_errors_hide_detail() {
        let resp = error_response(&ServiceError::Internal("disk on fire".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn internal_error_body_is_generic() {
        let resp = error_response(&ServiceError::Internal("disk on fire".into()));
        let body = body_json(resp).await;
        assert_eq!(body["code"], "internal_error");
        assert!(!body["message"].as_str().unwrap().contains("disk"));
    }
}
