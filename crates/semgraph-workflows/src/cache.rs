//! A minimal TTL-backed [`CacheStore`] reference implementation, used
//! by the incremental workflow's "invalidate caches" step (spec.md
//! §4.7). Trimmed from the teacher's `codegraph-cache` crate down to
//! the port's actual two-method contract.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use semgraph_core::{CacheStore, Result};

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct LocalCacheStore {
    entries: DashMap<String, Entry>,
}

impl LocalCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        Instant::now() < entry.expires_at
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn set_if_not_exists(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        if let Some(existing) = self.entries.get(key) {
            if Self::is_live(&existing) {
                return Ok(false);
            }
        }
        self.entries.insert(key.to_string(), Entry { value: value.to_string(), expires_at: Instant::now() + Duration::from_secs(ttl_secs) });
        Ok(true)
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_set_of_a_live_key_is_rejected() {
        let cache = LocalCacheStore::new();
        assert!(cache.set_if_not_exists("repo:1", "v1", 60).await.unwrap());
        assert!(!cache.set_if_not_exists("repo:1", "v2", 60).await.unwrap());
    }

    #[tokio::test]
    async fn invalidate_allows_a_fresh_set() {
        let cache = LocalCacheStore::new();
        cache.set_if_not_exists("repo:1", "v1", 60).await.unwrap();
        cache.invalidate("repo:1").await.unwrap();
        assert!(cache.set_if_not_exists("repo:1", "v2", 60).await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_allows_a_fresh_set() {
        let cache = LocalCacheStore::new();
        cache.set_if_not_exists("repo:1", "v1", 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.set_if_not_exists("repo:1", "v2", 60).await.unwrap());
    }
}
