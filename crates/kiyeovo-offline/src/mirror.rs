//! Local mirror of our own outgoing store (spec §4.3 "Put algorithm": "Read
//! the local mirror, authoritative for our own writes"): an in-memory,
//! TTL-expiring cache keyed by bucket key path, holding a parsed
//! [`OfflineStore`] rather than a raw DHT record, since we are the sole
//! writer and never need to re-validate our own signature.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use kiyeovo_types::offline_direct::OfflineStore;

struct MirrorEntry {
    store: OfflineStore,
    stored_at: Instant,
    ttl: Duration,
}

impl MirrorEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// Per-bucket cache of the store we last wrote, so a `put` does not need a
/// round trip to the DHT just to read back what we wrote moments ago.
pub struct BucketMirror {
    entries: HashMap<String, MirrorEntry>,
    default_ttl: Duration,
}

impl BucketMirror {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    /// The mirrored store for `bucket_key`, or `None` if absent or expired.
    pub fn get(&self, bucket_key: &str) -> Option<&OfflineStore> {
        self.entries.get(bucket_key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(&entry.store)
            }
        })
    }

    pub fn put(&mut self, bucket_key: String, store: OfflineStore) {
        self.entries.insert(
            bucket_key,
            MirrorEntry {
                store,
                stored_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );
    }

    /// Drop expired entries, returning how many were removed.
    pub fn expire(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired());
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
