//! API Module
//!
//! HTTP API layer of the server.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod cart;
pub mod error;
pub mod extract;
pub mod health;
pub mod user;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{request_context_middleware, session_middleware};
use crate::state::AppState;

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        // Auth endpoints
        .route("/auth/login/email", post(auth::login_email))
        .route("/auth/register/email", post(auth::register_email))
        .route("/auth/token/access", post(auth::new_access_token))
        .route("/auth/token/refresh", post(auth::new_refresh_token))
        .route("/auth/logout", post(auth::logout))
        // User endpoints
        .route("/users/me", get(user::me))
        .route("/users/session", get(user::session_user))
        .route("/users/id/{id}", get(user::get_user))
        // Cart endpoints
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_item))
        .route("/cart/update", put(cart::update_item))
        .route("/cart/delete", delete(cart::remove_item))
        // Middleware, innermost first
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(from_fn_with_state(state.clone(), request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}
