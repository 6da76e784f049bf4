//! Local bucket-store cache (spec §4.5 "Local caches"): TTL- and
//! LRU-by-size-bounded, so a poll or put does not need a DHT round trip to
//! re-read a store it saw moments ago. Mirrors `kiyeovo_offline::BucketMirror`
//! but additionally evicts by insertion order once the entry cap is hit,
//! since group buckets number one per `(group, epoch, sender)` and can grow
//! without bound the way a single-peer direct bucket does not.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use kiyeovo_types::offline_group::GroupOfflineStore;

struct CacheEntry {
    store: GroupOfflineStore,
    stored_at: Instant,
}

pub struct BucketCache {
    entries: HashMap<String, CacheEntry>,
    /// Insertion/touch order, oldest first, for LRU eviction.
    order: Vec<String>,
    ttl: Duration,
    max_entries: usize,
}

impl BucketCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            ttl,
            max_entries,
        }
    }

    pub fn get(&self, bucket_key: &str) -> Option<&GroupOfflineStore> {
        self.entries.get(bucket_key).and_then(|entry| {
            if entry.stored_at.elapsed() > self.ttl {
                None
            } else {
                Some(&entry.store)
            }
        })
    }

    pub fn put(&mut self, bucket_key: String, store: GroupOfflineStore) {
        if self.entries.insert(bucket_key.clone(), CacheEntry { store, stored_at: Instant::now() }).is_none() {
            self.order.push(bucket_key);
        }
        while self.entries.len() > self.max_entries {
            if self.order.is_empty() {
                break;
            }
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    /// Drop every cached entry belonging to `(group_id, key_version)`, for
    /// any sender — called on epoch retirement.
    pub fn evict_epoch(&mut self, group_id: kiyeovo_types::GroupId, key_version: u64) -> usize {
        let prefix = format!("/{}/{group_id}/{key_version}/", kiyeovo_dht::keys::GROUP_OFFLINE_NS);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        self.order.retain(|key| self.entries.contains_key(key));
        before - self.entries.len()
    }

    pub fn expire(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        self.order.retain(|key| self.entries.contains_key(key));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GroupOfflineStore {
        GroupOfflineStore::empty()
    }

    #[test]
    fn test_put_then_get_roundtrips() {
        let mut cache = BucketCache::new(Duration::from_secs(60), 10);
        cache.put("/kiyeovo-group-offline/g/1/a".to_string(), store());
        assert!(cache.get("/kiyeovo-group-offline/g/1/a").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_invisible() {
        let mut cache = BucketCache::new(Duration::from_millis(0), 10);
        cache.put("/k".to_string(), store());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("/k").is_none());
        assert_eq!(cache.expire(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction_at_cap() {
        let mut cache = BucketCache::new(Duration::from_secs(60), 2);
        cache.put("/a".to_string(), store());
        cache.put("/b".to_string(), store());
        cache.put("/c".to_string(), store());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("/a").is_none());
        assert!(cache.get("/b").is_some());
        assert!(cache.get("/c").is_some());
    }

    #[test]
    fn test_evict_epoch_drops_matching_buckets_only() {
        let mut cache = BucketCache::new(Duration::from_secs(60), 10);
        let group_id = uuid::Uuid::new_v4();
        let key_a = kiyeovo_dht::keys::group_offline_key(group_id, 1, &[1u8; 32]);
        let key_b = kiyeovo_dht::keys::group_offline_key(group_id, 2, &[1u8; 32]);
        cache.put(key_a.clone(), store());
        cache.put(key_b.clone(), store());
        assert_eq!(cache.evict_epoch(group_id, 1), 1);
        assert!(cache.get(&key_a).is_none());
        assert!(cache.get(&key_b).is_some());
    }
}
