//! Request context
//!
//! Tags every request with a request id (taken from `X-Request-ID` or
//! generated) and the user id of a well-formed Bearer token, runs the rest of
//! the stack inside a span carrying both, logs the outcome and echoes the id
//! back in the response.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::service::token;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub async fn request_context_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Identification only, authorization happens in the extractors
    let user_id = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| token::extract_token(Some(h), true).ok())
        .and_then(|t| token::verify_token(&state.config, t).ok())
        .map(|claims| claims.sub)
        .unwrap_or_else(|| "-".to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("request", request_id = %request_id, user_id = %user_id);

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            "{} {} [{}] {:.4}s",
            method,
            path,
            response.status().as_u16(),
            started.elapsed().as_secs_f64()
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::{
        Router, body::Body, http::Request as HttpRequest, middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let (state, _cache) = test_state();
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(state.clone(), request_context_middleware))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let request = HttpRequest::builder()
            .uri("/")
            .header("X-Request-ID", "req-123")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "req-123"
        );
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let request = HttpRequest::builder()
            .uri("/")
            .header(AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}
