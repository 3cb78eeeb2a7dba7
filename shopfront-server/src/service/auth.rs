//! Auth Service
//!
//! Credential checks, registration and the token lifecycle: login,
//! rotation and logout.

use shopfront_core::domain::user::User;
use shopfront_core::dto::auth::{RegisterUser, TokenPair};
use sqlx::PgPool;
use thiserror::Error;

use crate::cache::{Cache, CacheError};
use crate::config::{Config, REFRESH_STORE_TTL};
use crate::repository::token_repository;
use crate::repository::user_repository::{self, NewUser};
use crate::service::token::{self, Claims, TokenError, TokenKind, TokenSubject};
use crate::service::user_service;

/// Service error type
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user does not exist")]
    UnknownUser,

    #[error("password does not match")]
    WrongPassword,

    #[error("{0} is already registered")]
    Duplicate(&'static str),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),
}

async fn hash_password(password: String, rounds: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, rounds))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check an email/password pair
pub async fn authenticate(
    pool: &PgPool,
    identifier: &str,
    password: &str,
) -> Result<User, AuthError> {
    let (user, hash) = user_repository::find_credentials_by_email(pool, identifier)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    if !verify_password(password.to_string(), hash).await? {
        tracing::info!("Password mismatch for user {}", user.id);
        return Err(AuthError::WrongPassword);
    }

    Ok(user)
}

/// Issue an access/refresh pair and store the refresh token
pub async fn login(cache: &dyn Cache, config: &Config, user: &User) -> Result<TokenPair, AuthError> {
    let subject = TokenSubject::from(user);
    let access_token = token::sign_token(config, &subject, TokenKind::Access)?;
    let refresh_token = token::sign_token(config, &subject, TokenKind::Refresh)?;

    token_repository::save_refresh_token(
        cache,
        user.id,
        &refresh_token,
        REFRESH_STORE_TTL.as_secs(),
    )
    .await?;

    tracing::info!("User {} logged in", user.id);

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Create an account and log it in
///
/// The request is expected to be validated already. A concurrent registration
/// that wins the race on the same email or nickname still yields `Duplicate`.
pub async fn register(
    pool: &PgPool,
    cache: &dyn Cache,
    config: &Config,
    req: RegisterUser,
) -> Result<TokenPair, AuthError> {
    if let Some(field) = user_repository::find_taken_field(pool, &req.email, &req.nickname).await? {
        return Err(AuthError::Duplicate(field));
    }

    let password_hash = hash_password(req.password, config.bcrypt_rounds).await?;

    let user = user_repository::create(
        pool,
        NewUser {
            nickname: &req.nickname,
            email: &req.email,
            password_hash: &password_hash,
        },
    )
    .await
    .map_err(|e| match user_repository::duplicate_field(&e) {
        Some(field) => AuthError::Duplicate(field),
        None => AuthError::DatabaseError(e),
    })?;

    tracing::info!("User registered: {} ({})", user.id, user.email);

    login(cache, config, &user).await
}

/// Issue a new token of `kind` from a verified refresh token
///
/// Rotating the refresh token itself replaces the stored one and revokes
/// the old token for the rest of its lifetime.
pub async fn rotate(
    cache: &dyn Cache,
    config: &Config,
    claims: &Claims,
    raw_token: &str,
    kind: TokenKind,
) -> Result<String, AuthError> {
    let new_token = token::rotate_token(config, raw_token, kind)?;

    if kind == TokenKind::Refresh {
        let user_id = claims.user_id()?;

        let stored = token_repository::get_refresh_token(cache, user_id).await?;
        if stored.as_deref().is_some_and(|stored| stored != raw_token) {
            tracing::warn!("User {} rotated a refresh token that is not the stored one", user_id);
        }

        token_repository::save_refresh_token(
            cache,
            user_id,
            &new_token,
            REFRESH_STORE_TTL.as_secs(),
        )
        .await?;
        token_repository::blacklist_token(cache, raw_token, claims.exp).await?;
        tracing::info!("Refresh token rotated for user {}", user_id);
    }

    Ok(new_token)
}

/// Revoke the tokens of a user
///
/// `refresh_token` is the value of the refresh cookie, if the client sent
/// one; it is only revoked when it still verifies.
pub async fn logout(
    cache: &dyn Cache,
    config: &Config,
    claims: &Claims,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Result<(), AuthError> {
    let user_id = claims.user_id()?;

    token_repository::blacklist_token(cache, access_token, claims.exp).await?;

    if let Some(refresh_token) = refresh_token {
        match token::verify_token(config, refresh_token) {
            Ok(refresh) if refresh.kind == TokenKind::Refresh => {
                token_repository::blacklist_token(cache, refresh_token, refresh.exp).await?;
            }
            Ok(_) => tracing::debug!("Refresh cookie of user {} holds a non-refresh token", user_id),
            Err(e) => tracing::debug!("Ignoring refresh cookie of user {}: {}", user_id, e),
        }
    }

    token_repository::delete_refresh_token(cache, user_id).await?;
    user_service::invalidate(cache, user_id).await?;

    tracing::info!("User {} logged out", user_id);

    Ok(())
}
