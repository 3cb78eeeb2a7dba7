//! Auth API Handlers
//!
//! Login, registration, token reissue and logout.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use shopfront_core::domain::cart::Cart;
use shopfront_core::dto::auth::{
    AccessTokenResponse, RefreshTokenResponse, RegisterUser, TokenPair,
};

use crate::api::error::ApiResult;
use crate::api::extract::{AccessToken, BasicAuth, RefreshToken, ValidatedJson};
use crate::config::{Config, REFRESH_STORE_TTL};
use crate::middleware::Session;
use crate::service::token::TokenKind;
use crate::service::{auth_service, cart_service};
use crate::state::AppState;

pub const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(config: &Config, refresh_token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, refresh_token);
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure());
    cookie.set_same_site(config.cookie_same_site());
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(REFRESH_STORE_TTL.as_secs() as i64));
    cookie
}

/// POST /auth/login/email
/// Log in with Basic credentials
///
/// The refresh token only travels in its cookie. With sessions enabled an
/// anonymous session cart is merged into the user's persisted cart; a session
/// that already had a user gets the persisted cart of the new one.
pub async fn login_email(
    State(state): State<AppState>,
    jar: CookieJar,
    session: Option<Session>,
    BasicAuth(user): BasicAuth,
) -> ApiResult<(CookieJar, Json<AccessTokenResponse>)> {
    let pair = auth_service::login(state.cache.as_ref(), &state.config, &user).await?;

    if let Some(session) = session {
        let previous = session.optional_user().await;
        let session_cart = session.cart().await.unwrap_or_else(|_| Cart::new());
        let cart = cart_service::cart_for_login(
            &state.pool,
            user.id,
            previous.as_ref(),
            &session_cart,
        )
        .await?;

        session.set_user(&user).await?;
        session.set_cart(&cart).await?;
    }

    let jar = jar.add(refresh_cookie(&state.config, pair.refresh_token));

    Ok((
        jar,
        Json(AccessTokenResponse {
            access_token: pair.access_token,
        }),
    ))
}

/// POST /auth/register/email
/// Register and log in
pub async fn register_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterUser>,
) -> ApiResult<Json<TokenPair>> {
    tracing::info!("Registering user: {}", req.email);

    let pair = auth_service::register(&state.pool, state.cache.as_ref(), &state.config, req).await?;

    Ok(Json(pair))
}

/// POST /auth/token/access
/// Reissue an access token from a refresh token
pub async fn new_access_token(
    State(state): State<AppState>,
    RefreshToken(bearer): RefreshToken,
) -> ApiResult<Json<AccessTokenResponse>> {
    let access_token = auth_service::rotate(
        state.cache.as_ref(),
        &state.config,
        &bearer.claims,
        &bearer.token,
        TokenKind::Access,
    )
    .await?;

    Ok(Json(AccessTokenResponse { access_token }))
}

/// POST /auth/token/refresh
/// Rotate the refresh token
pub async fn new_refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    RefreshToken(bearer): RefreshToken,
) -> ApiResult<(CookieJar, Json<RefreshTokenResponse>)> {
    let refresh_token = auth_service::rotate(
        state.cache.as_ref(),
        &state.config,
        &bearer.claims,
        &bearer.token,
        TokenKind::Refresh,
    )
    .await?;

    let jar = jar.add(refresh_cookie(&state.config, refresh_token.clone()));

    Ok((jar, Json(RefreshTokenResponse { refresh_token })))
}

/// POST /auth/logout
/// Revoke the caller's tokens and end the session
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    session: Option<Session>,
    AccessToken(bearer): AccessToken,
) -> ApiResult<(CookieJar, StatusCode)> {
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    auth_service::logout(
        state.cache.as_ref(),
        &state.config,
        &bearer.claims,
        &bearer.token,
        refresh_token.as_deref(),
    )
    .await?;

    if let Some(session) = session {
        session.clear().await;
    }

    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/"));

    Ok((jar, StatusCode::NO_CONTENT))
}
