//! Cache Module
//!
//! Key/value access to Redis behind a trait, so the session, token and user
//! caches can be exercised against an in-memory store in tests.

#[cfg(test)]
pub mod memory;
pub mod redis;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use self::redis::RedisCache;

/// Errors raised by a cache backend
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("unexpected cache response: {0}")]
    UnexpectedResponse(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// The subset of Redis commands the application relies on
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// SET with an expiry in seconds
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// All fields of a hash; empty when the key does not exist
    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()>;

    async fn hdel(&self, key: &str, fields: &[String]) -> CacheResult<()>;

    async fn expire(&self, key: &str, ttl_seconds: i64) -> CacheResult<()>;

    /// Round-trip check used at startup
    async fn ping(&self) -> CacheResult<()> {
        self.set_ex("__ping__", "pong", 5).await?;
        match self.get("__ping__").await? {
            Some(value) if value == "pong" => Ok(()),
            other => Err(CacheError::UnexpectedResponse(format!("{:?}", other))),
        }
    }
}
