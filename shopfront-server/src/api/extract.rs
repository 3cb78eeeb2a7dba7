//! Request extractors
//!
//! Authentication guards and validated JSON bodies.
//!
//! ```ignore
//! async fn me(AuthUser(user): AuthUser) -> Json<User> { Json(user) }
//! ```

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::de::DeserializeOwned;
use shopfront_core::domain::user::User;
use validator::Validate;

use crate::api::error::ApiError;
use crate::repository::token_repository;
use crate::service::token::{self, Claims, TokenKind};
use crate::service::{auth_service, user_service};
use crate::state::AppState;

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// User authenticated by `Authorization: Basic base64(email:password)`
#[derive(Debug, Clone)]
pub struct BasicAuth(pub User);

impl FromRequestParts<AppState> for BasicAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = token::extract_token(authorization(parts), false)?;
        let credentials = token::decode_basic(raw)?;

        let user = auth_service::authenticate(
            &state.pool,
            &credentials.identifier,
            &credentials.password,
        )
        .await?;

        Ok(BasicAuth(user))
    }
}

/// A verified, non-revoked Bearer token of any kind
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub claims: Claims,
    pub token: String,
}

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = token::extract_token(authorization(parts), true)?;

        if token_repository::is_blacklisted(state.cache.as_ref(), raw).await? {
            return Err(ApiError::Unauthorized(
                "token has been logged out".to_string(),
            ));
        }

        let claims = token::verify_token(&state.config, raw)?;
        claims.user_id()?;

        Ok(BearerToken {
            claims,
            token: raw.to_string(),
        })
    }
}

async fn bearer_of_kind(
    parts: &mut Parts,
    state: &AppState,
    kind: TokenKind,
) -> Result<BearerToken, ApiError> {
    let bearer = BearerToken::from_request_parts(parts, state).await?;

    if bearer.claims.kind != kind {
        let message = match kind {
            TokenKind::Access => "not an access token",
            TokenKind::Refresh => "not a refresh token",
        };
        return Err(ApiError::Unauthorized(message.to_string()));
    }

    Ok(bearer)
}

/// Bearer access token
#[derive(Debug, Clone)]
pub struct AccessToken(pub BearerToken);

impl FromRequestParts<AppState> for AccessToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_of_kind(parts, state, TokenKind::Access)
            .await
            .map(AccessToken)
    }
}

/// Bearer refresh token
#[derive(Debug, Clone)]
pub struct RefreshToken(pub BearerToken);

impl FromRequestParts<AppState> for RefreshToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_of_kind(parts, state, TokenKind::Refresh)
            .await
            .map(RefreshToken)
    }
}

/// The user behind a Bearer access token
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AccessToken(bearer) = AccessToken::from_request_parts(parts, state).await?;
        let user_id = bearer.claims.user_id()?;

        let user = user_service::current_user(&state.pool, state.cache.as_ref(), user_id).await?;
        Ok(AuthUser(user))
    }
}

/// An `AuthUser` with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            tracing::warn!("User {} denied admin access", user.id);
            return Err(ApiError::Forbidden("permission denied".to_string()));
        }

        Ok(AdminUser(user))
    }
}

/// JSON body checked with `validator`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation {
                message: rejection.body_text(),
                details: None,
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}
