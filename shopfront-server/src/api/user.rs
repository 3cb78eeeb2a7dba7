//! User API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shopfront_core::domain::user::User;

use crate::api::error::ApiResult;
use crate::api::extract::{AdminUser, AuthUser};
use crate::middleware::Session;
use crate::service::user_service;
use crate::state::AppState;

/// GET /users/me
/// The user behind the access token
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// GET /users/session
/// The user logged in to the session
pub async fn session_user(session: Session) -> ApiResult<Json<User>> {
    Ok(Json(session.user().await?))
}

/// GET /users/id/{id}
/// Look up any user (admin only)
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    tracing::debug!("Admin {} looking up user {}", admin.id, id);

    let user = user_service::get_user(&state.pool, id).await?;
    Ok(Json(user))
}
