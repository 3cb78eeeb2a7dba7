//! Redis-backed session
//!
//! The session id lives in the `session_redis_id` cookie; its data lives in
//! the Redis hash `session:{id}`, one JSON-encoded value per field.
//!
//! The middleware loads the hash before the handler runs and writes it back
//! afterwards. A session emptied by the handler (logout) is deleted together
//! with its cookie. Cache failures are logged and never fail the request.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use shopfront_core::domain::{cart::Cart, user::User};
use tokio::sync::Mutex;

use crate::api::error::ApiError;
use crate::cache::{Cache, CacheResult};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_redis_id";

const USER_FIELD: &str = "user";
const CART_FIELD: &str = "cart";

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Per-request session data, shared between the middleware and the handler
#[derive(Clone, Default)]
pub struct Session {
    data: Arc<Mutex<HashMap<String, Value>>>,
}

impl Session {
    fn from_data(data: HashMap<String, Value>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Typed read of a field; `Ok(None)` when absent
    pub async fn get<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, serde_json::Error> {
        let data = self.data.lock().await;
        data.get(field)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
    }

    pub async fn insert<T: Serialize>(&self, field: &str, value: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.data.lock().await.insert(field.to_string(), value);
        Ok(())
    }

    pub async fn remove(&self, field: &str) {
        self.data.lock().await.remove(field);
    }

    /// Drop every field; the middleware then deletes the session
    pub async fn clear(&self) {
        self.data.lock().await.clear();
    }

    async fn snapshot(&self) -> HashMap<String, Value> {
        self.data.lock().await.clone()
    }

    /// Logged-in user of the session
    pub async fn user(&self) -> Result<User, ApiError> {
        match self.get::<User>(USER_FIELD).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::warn!("No user in session");
                Err(ApiError::Unauthorized("login required".to_string()))
            }
            Err(e) => {
                tracing::warn!("Failed to parse session user: {}", e);
                Err(ApiError::Unauthorized(
                    "session user is corrupted".to_string(),
                ))
            }
        }
    }

    /// Logged-in user of the session, `None` when absent or unreadable
    pub async fn optional_user(&self) -> Option<User> {
        self.get::<User>(USER_FIELD).await.ok().flatten()
    }

    pub async fn set_user(&self, user: &User) -> Result<(), ApiError> {
        self.insert(USER_FIELD, user)
            .await
            .map_err(|e| ApiError::InternalError(format!("failed to store session user: {}", e)))
    }

    /// Cart of the session, empty when none was stored yet
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        match self.get::<Cart>(CART_FIELD).await {
            Ok(cart) => Ok(cart.unwrap_or_default()),
            Err(e) => {
                tracing::warn!("Failed to parse session cart: {}", e);
                Err(ApiError::BadRequest("cart data is corrupted".to_string()))
            }
        }
    }

    pub async fn set_cart(&self, cart: &Cart) -> Result<(), ApiError> {
        self.insert(CART_FIELD, cart)
            .await
            .map_err(|e| ApiError::InternalError(format!("failed to store session cart: {}", e)))
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::InternalError("session layer is not installed".to_string()))
    }
}

/// `Option<Session>` for handlers that also work with sessions disabled
impl<S> OptionalFromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned())
    }
}

/// Session middleware, installed with `from_fn_with_state`
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let max_age = state.config.session_max_age();
    if max_age <= 0 {
        return next.run(request).await;
    }

    let cache = state.cache.as_ref();

    let (session_id, loaded, loaded_fields) =
        match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
            Some(id) => {
                let (loaded, fields) = load(cache, &id, max_age).await.unwrap_or_else(|e| {
                    tracing::error!("Failed to load session {}: {}", id, e);
                    (HashMap::new(), HashSet::new())
                });
                (id, loaded, fields)
            }
            None => (uuid::Uuid::new_v4().to_string(), HashMap::new(), HashSet::new()),
        };

    // unreadable fields count too, so they get cleaned up on the way out
    let was_empty = loaded_fields.is_empty();

    let session = Session::from_data(loaded);
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    let data = session.snapshot().await;

    if !data.is_empty() {
        if let Err(e) = store(cache, &session_id, &data, &loaded_fields, max_age).await {
            tracing::error!("Failed to store session {}: {}", session_id, e);
        }

        let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
        cookie.set_http_only(true);
        cookie.set_secure(state.config.cookie_secure());
        cookie.set_same_site(state.config.cookie_same_site());
        cookie.set_path("/");
        cookie.set_max_age(time::Duration::seconds(max_age));
        return (jar.add(cookie), response).into_response();
    }

    if !was_empty {
        if let Err(e) = cache.delete(&session_key(&session_id)).await {
            tracing::error!("Failed to delete session {}: {}", session_id, e);
        }
        tracing::debug!("Session {} cleared", session_id);
        return (jar.remove(Cookie::build(SESSION_COOKIE).path("/")), response).into_response();
    }

    response
}

/// Session data plus the name of every field in the hash, readable or not
async fn load(
    cache: &dyn Cache,
    session_id: &str,
    max_age: i64,
) -> CacheResult<(HashMap<String, Value>, HashSet<String>)> {
    let key = session_key(session_id);
    let raw = cache.hgetall(&key).await?;

    if raw.is_empty() {
        return Ok((HashMap::new(), HashSet::new()));
    }

    cache.expire(&key, max_age).await?;

    let fields = raw.keys().cloned().collect();
    let data = raw
        .into_iter()
        .filter_map(|(field, value)| match serde_json::from_str(&value) {
            Ok(value) => Some((field, value)),
            Err(e) => {
                tracing::warn!("Dropping unreadable session field {}: {}", field, e);
                None
            }
        })
        .collect();

    Ok((data, fields))
}

async fn store(
    cache: &dyn Cache,
    session_id: &str,
    data: &HashMap<String, Value>,
    loaded_fields: &HashSet<String>,
    max_age: i64,
) -> CacheResult<()> {
    let key = session_key(session_id);

    let fields: Vec<(String, String)> = data
        .iter()
        .map(|(field, value)| (field.clone(), value.to_string()))
        .collect();
    cache.hset_multiple(&key, &fields).await?;

    let removed: Vec<String> = loaded_fields
        .iter()
        .filter(|field| !data.contains_key(*field))
        .cloned()
        .collect();
    cache.hdel(&key, &removed).await?;

    cache.expire(&key, max_age).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::config::{Config, Environment};
    use crate::state::test_support::{state_with, test_state};
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode, header},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;

    async fn write_handler(session: Session) -> StatusCode {
        session.insert("greeting", &"hello").await.unwrap();
        StatusCode::OK
    }

    async fn read_handler(session: Session) -> String {
        session
            .get::<String>("greeting")
            .await
            .unwrap()
            .unwrap_or_else(|| "none".to_string())
    }

    async fn clear_handler(session: Session) -> StatusCode {
        session.clear().await;
        StatusCode::OK
    }

    async fn remove_handler(session: Session) -> StatusCode {
        session.remove("greeting").await;
        StatusCode::OK
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/write", get(write_handler))
            .route("/read", get(read_handler))
            .route("/clear", get(clear_handler))
            .route("/remove", get(remove_handler))
            .layer(from_fn_with_state(state.clone(), session_middleware))
            .with_state(state)
    }

    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn request(uri: &str, session_id: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(id) = session_id {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, id));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_session_sets_no_cookie() {
        let (state, _cache) = test_state();
        let response = app(state).oneshot(request("/read", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_written_session_is_persisted() {
        let (state, cache) = test_state();
        let response = app(state).oneshot(request("/write", None)).await.unwrap();

        let cookie = set_cookie(&response).expect("session cookie");
        assert!(cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));

        let session_id = cookie
            .split(';')
            .next()
            .and_then(|kv| kv.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap();

        let stored = cache.hgetall(&session_key(&session_id)).await.unwrap();
        assert_eq!(stored.get("greeting").map(String::as_str), Some("\"hello\""));
        assert!(cache.ttl(&session_key(&session_id)).await.is_some());
    }

    #[tokio::test]
    async fn test_existing_session_is_loaded() {
        let (state, cache) = test_state();
        cache
            .hset_multiple(
                "session:abc",
                &[("greeting".to_string(), "\"welcome back\"".to_string())],
            )
            .await
            .unwrap();

        let response = app(state)
            .oneshot(request("/read", Some("abc")))
            .await
            .unwrap();

        // a non-empty session is written back and its cookie refreshed
        assert!(set_cookie(&response).unwrap().contains("abc"));
        assert_eq!(body_string(response).await, "welcome back");
    }

    #[tokio::test]
    async fn test_cleared_session_is_deleted() {
        let (state, cache) = test_state();
        cache
            .hset_multiple("session:gone", &[("user".to_string(), "1".to_string())])
            .await
            .unwrap();

        let response = app(state)
            .oneshot(request("/clear", Some("gone")))
            .await
            .unwrap();

        let cookie = set_cookie(&response).expect("removal cookie");
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cache.contains("session:gone").await);
    }

    #[tokio::test]
    async fn test_removed_field_is_deleted_from_hash() {
        let (state, cache) = test_state();
        cache
            .hset_multiple(
                "session:s1",
                &[
                    ("greeting".to_string(), "\"hi\"".to_string()),
                    ("cart".to_string(), "{}".to_string()),
                ],
            )
            .await
            .unwrap();

        app(state)
            .oneshot(request("/remove", Some("s1")))
            .await
            .unwrap();

        let stored = cache.hgetall("session:s1").await.unwrap();
        assert!(!stored.contains_key("greeting"));
        assert!(stored.contains_key("cart"));
    }

    #[tokio::test]
    async fn test_unreadable_field_is_deleted_from_hash() {
        let (state, cache) = test_state();
        cache
            .hset_multiple(
                "session:s2",
                &[
                    ("greeting".to_string(), "\"hi\"".to_string()),
                    ("broken".to_string(), "{not json".to_string()),
                ],
            )
            .await
            .unwrap();

        let response = app(state)
            .oneshot(request("/read", Some("s2")))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "hi");

        let stored = cache.hgetall("session:s2").await.unwrap();
        assert!(!stored.contains_key("broken"));
        assert_eq!(stored.get("greeting").map(String::as_str), Some("\"hi\""));
    }

    #[tokio::test]
    async fn test_unreadable_session_is_deleted() {
        let (state, cache) = test_state();
        cache
            .hset_multiple("session:s3", &[("broken".to_string(), "{".to_string())])
            .await
            .unwrap();

        let response = app(state)
            .oneshot(request("/read", Some("s3")))
            .await
            .unwrap();

        assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
        assert!(!cache.contains("session:s3").await);
    }

    #[tokio::test]
    async fn test_production_cookie_is_secure() {
        let cache = Arc::new(MemoryCache::new());
        let config = Config {
            environment: Environment::Production,
            ..Config::default()
        };
        let state = state_with(cache, config);

        let response = app(state).oneshot(request("/write", None)).await.unwrap();

        let cookie = set_cookie(&response).expect("session cookie");
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=2592000"));
    }

    #[tokio::test]
    async fn test_disabled_sessions_bypass_middleware() {
        let cache = Arc::new(MemoryCache::new());
        let config = Config {
            redis_session_max_age: 0,
            ..Config::default()
        };
        let state = state_with(cache, config);

        let response = app(state).oneshot(request("/write", None)).await.unwrap();

        // the extractor finds no session
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_session_cart_and_user_helpers() {
        let session = Session::default();
        assert!(session.cart().await.unwrap().is_empty());
        assert!(session.optional_user().await.is_none());
        assert!(matches!(
            session.user().await,
            Err(ApiError::Unauthorized(_))
        ));

        session
            .insert("cart", &serde_json::json!(["not", "a", "cart"]))
            .await
            .unwrap();
        assert!(matches!(session.cart().await, Err(ApiError::BadRequest(_))));
    }
}
