//! Token Repository
//!
//! Redis keys backing the refresh token store and the token blacklist:
//! - `refresh:{user_id}` holds the current refresh token of a user
//! - `blacklist:{token}` marks a token as revoked until it expires on its own

use crate::cache::{Cache, CacheResult};

fn refresh_key(user_id: i64) -> String {
    format!("refresh:{}", user_id)
}

fn blacklist_key(token: &str) -> String {
    format!("blacklist:{}", token)
}

/// Store the refresh token of a user, replacing any previous one
pub async fn save_refresh_token(
    cache: &dyn Cache,
    user_id: i64,
    refresh_token: &str,
    ttl_seconds: u64,
) -> CacheResult<()> {
    cache
        .set_ex(&refresh_key(user_id), refresh_token, ttl_seconds)
        .await
}

pub async fn get_refresh_token(cache: &dyn Cache, user_id: i64) -> CacheResult<Option<String>> {
    cache.get(&refresh_key(user_id)).await
}

pub async fn delete_refresh_token(cache: &dyn Cache, user_id: i64) -> CacheResult<()> {
    cache.delete(&refresh_key(user_id)).await
}

pub async fn is_blacklisted(cache: &dyn Cache, token: &str) -> CacheResult<bool> {
    cache.exists(&blacklist_key(token)).await
}

/// Blacklist a token until its expiry `exp` (unix seconds)
///
/// Returns `false` without touching Redis when the token is already expired.
pub async fn blacklist_token(cache: &dyn Cache, token: &str, exp: i64) -> CacheResult<bool> {
    let ttl = exp - chrono::Utc::now().timestamp();
    if ttl <= 0 {
        return Ok(false);
    }

    cache.set_ex(&blacklist_key(token), "1", ttl as u64).await?;
    Ok(true)
}
