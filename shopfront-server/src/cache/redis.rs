//! Redis-backed cache
//!
//! Uses a `ConnectionManager`, which multiplexes one connection and
//! reconnects on failure. Cloning it per command is cheap.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use super::{Cache, CacheResult};

#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis
    ///
    /// # Arguments
    /// * `redis_url` - e.g. "redis://127.0.0.1:6379/0"
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let _: () = conn.hdel(key, fields).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.expire(key, ttl_seconds).await?;
        Ok(())
    }
}
