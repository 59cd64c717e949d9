use sha2::{Digest, Sha256};
use std::time::Duration;

/// Content-addressed de-duplication cache for inbound datagrams.
///
/// Every node floods some messages to multiple peers (broadcasts) and
/// the network itself may redeliver a datagram; this cache lets the
/// transport recognize and drop a payload it has already handled
/// within the TTL window, the same role the coordinator's bigcache
/// instance plays.
pub struct DedupCache {
    cache: moka::future::Cache<String, ()>,
}

impl DedupCache {
    /// Create a cache that forgets an entry `ttl` after it was
    /// inserted.
    pub fn new(ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Hash `payload` into a cache key.
    pub fn key_for(payload: &[u8]) -> String {
        hex::encode(Sha256::digest(payload))
    }

    /// Returns `true` if `key` was already present (a duplicate);
    /// otherwise records it and returns `false`.
    pub async fn check_and_insert(&self, key: String) -> bool {
        if self.cache.get(&key).await.is_some() {
            return true;
        }
        self.cache.insert(key, ()).await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_insert_of_same_key_is_a_duplicate() {
        let cache = DedupCache::new(Duration::from_secs(60));
        let key = DedupCache::key_for(b"hello");
        assert!(!cache.check_and_insert(key.clone()).await);
        assert!(cache.check_and_insert(key).await);
    }

    #[tokio::test]
    async fn different_payloads_are_not_duplicates() {
        let cache = DedupCache::new(Duration::from_secs(60));
        let a = DedupCache::key_for(b"hello");
        let b = DedupCache::key_for(b"world");
        assert!(!cache.check_and_insert(a).await);
        assert!(!cache.check_and_insert(b).await);
    }
}
