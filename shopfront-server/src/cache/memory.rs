//! In-memory cache for tests
//!
//! Honors TTLs lazily: an expired entry is dropped the next time it is read.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Cache, CacheResult};

#[derive(Debug, Clone)]
enum Value {
    String(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time to live of a key, `None` if missing or persistent
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub async fn contains(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        live(&mut entries, key).is_some()
    }
}

fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let expired = entries
        .get(key)
        .and_then(|e| e.expires_at)
        .is_some_and(|at| at <= Instant::now());

    if expired {
        entries.remove(key);
        return None;
    }

    entries.get_mut(key)
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        Ok(match live(&mut entries, key) {
            Some(Entry {
                value: Value::String(s),
                ..
            }) => Some(s.clone()),
            _ => None,
        })
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::String(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.contains(key).await)
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut entries = self.entries.lock().await;
        Ok(match live(&mut entries, key) {
            Some(Entry {
                value: Value::Hash(h),
                ..
            }) => h.clone(),
            _ => HashMap::new(),
        })
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        if live(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Hash(HashMap::new()),
                    expires_at: None,
                },
            );
        }

        if let Some(Entry {
            value: Value::Hash(hash),
            ..
        }) = entries.get_mut(key)
        {
            for (field, value) in fields {
                hash.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        if let Some(Entry {
            value: Value::Hash(hash),
            ..
        }) = live(&mut entries, key)
        {
            for field in fields {
                hash.remove(field);
            }
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        if ttl_seconds <= 0 {
            entries.remove(key);
        } else if let Some(entry) = live(&mut entries, key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_seconds as u64));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_hash_operations() {
        let cache = MemoryCache::new();
        cache
            .hset_multiple(
                "session:a",
                &[
                    ("user".to_string(), "1".to_string()),
                    ("cart".to_string(), "{}".to_string()),
                ],
            )
            .await
            .unwrap();
        cache.hdel("session:a", &["cart".to_string()]).await.unwrap();

        let fields = cache.hgetall("session:a").await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("user").map(String::as_str), Some("1"));
        assert!(cache.hgetall("session:missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expire_sets_ttl() {
        let cache = MemoryCache::new();
        cache.set_ex("k", "v", 10).await.unwrap();
        cache.expire("k", 100).await.unwrap();
        assert!(cache.ttl("k").await.unwrap() > Duration::from_secs(10));

        cache.expire("k", 0).await.unwrap();
        assert!(!cache.exists("k").await.unwrap());
    }
}
