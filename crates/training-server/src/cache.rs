//! Fixed-TTL in-memory cache.
//!
//! Entries expire a fixed duration after insertion. Expired entries are
//! treated as absent on read and dropped by [`TtlCache::purge_expired`],
//! which the server runs on an interval.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared map whose entries live for a fixed TTL.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live entry.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless someone refreshed it meanwhile.
        let mut guard = self.entries.write().await;
        if let Some(entry) = guard.get(key) {
            if entry.expires_at <= Instant::now() {
                guard.remove(key);
            }
        }
        None
    }

    /// Insert or replace an entry, restarting its TTL.
    pub async fn insert(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Remove an entry. Returns whether one was present.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Remove every entry matching the predicate.
    pub async fn invalidate_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|k, e| !predicate(k, &e.value));
        before - guard.len()
    }

    /// Drop all expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, e| e.expires_at > now);
        before - guard.len()
    }

    /// Number of stored entries, including not-yet-purged expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(30));
        cache.insert("token".to_string(), 1).await;
        assert_eq!(cache.get(&"token".to_string()).await, Some(1));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get(&"token".to_string()).await, Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"token".to_string()).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_restarts_ttl() {
        let cache: TtlCache<&'static str, &'static str> = TtlCache::new(Duration::from_secs(10));
        cache.insert("a", "first").await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("a", "second").await;
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"a").await, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(5));
        cache.insert(1, 1).await;
        tokio::time::advance(Duration::from_secs(3)).await;
        cache.insert(2, 2).await;
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&2).await, Some(2));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache: TtlCache<u32, String> = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, "one".to_string()).await;
        cache.insert(2, "two".to_string()).await;
        cache.insert(3, "three".to_string()).await;

        assert!(cache.invalidate(&1).await);
        assert!(!cache.invalidate(&1).await);
        assert_eq!(cache.invalidate_where(|_, v| v.starts_with('t')).await, 2);
        assert!(cache.is_empty().await);
    }
}
