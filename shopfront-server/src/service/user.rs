//! User Service
//!
//! User lookups, with the current user served from the `user:{id}` cache.

use shopfront_core::domain::user::User;
use sqlx::PgPool;
use thiserror::Error;

use crate::cache::{Cache, CacheError, CacheResult};
use crate::config::USER_CACHE_TTL;
use crate::repository::user_repository;

/// Service error type
#[derive(Debug, Error)]
pub enum UserError {
    #[error("user {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),
}

fn user_key(user_id: i64) -> String {
    format!("user:{}", user_id)
}

/// Get a user by ID, straight from the database
pub async fn get_user(pool: &PgPool, id: i64) -> Result<User, UserError> {
    user_repository::find_by_id(pool, id)
        .await?
        .ok_or(UserError::NotFound(id))
}

/// Resolve the user behind an access token
///
/// Served from the cache when possible; a cache miss loads the user and
/// caches it for an hour.
pub async fn current_user(
    pool: &PgPool,
    cache: &dyn Cache,
    user_id: i64,
) -> Result<User, UserError> {
    let key = user_key(user_id);

    if let Some(raw) = cache.get(&key).await? {
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => return Ok(user),
            Err(e) => tracing::warn!("Ignoring unreadable cached user {}: {}", user_id, e),
        }
    }

    let user = get_user(pool, user_id).await?;

    match serde_json::to_string(&user) {
        Ok(raw) => {
            cache
                .set_ex(&key, &raw, USER_CACHE_TTL.as_secs())
                .await?;
            tracing::debug!("Cached user {}", user_id);
        }
        Err(e) => tracing::warn!("Failed to serialize user {}: {}", user_id, e),
    }

    Ok(user)
}

/// Drop the cached copy of a user
pub async fn invalidate(cache: &dyn Cache, user_id: i64) -> CacheResult<()> {
    cache.delete(&user_key(user_id)).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::state::test_support::test_state;
    use shopfront_core::domain::user::Role;

    pub(crate) fn sample_user(id: i64, role: Role) -> User {
        User {
            id,
            nickname: format!("user{}", id),
            email: format!("user{}@example.com", id),
            login_id: None,
            phone: None,
            role,
            created_at: chrono::Utc::now(),
        }
    }

    /// Put a user into the cache so lookups stay off the database
    pub(crate) async fn cache_user(cache: &MemoryCache, user: &User) {
        cache
            .set_ex(
                &user_key(user.id),
                &serde_json::to_string(user).unwrap(),
                60,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_current_user_from_cache() {
        let (state, cache) = test_state();
        let user = sample_user(7, Role::Admin);
        cache_user(&cache, &user).await;

        let found = current_user(&state.pool, state.cache.as_ref(), 7)
            .await
            .unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MemoryCache::new();
        cache_user(&cache, &sample_user(3, Role::User)).await;

        invalidate(&cache, 3).await.unwrap();
        assert!(!cache.contains("user:3").await);
    }
}
