//! Tunables for the group offline epoch engine (spec §6 glossary:
//! `GROUP_OFFLINE_MESSAGE_TTL_MS`, `GROUP_MAX_MESSAGES_PER_SENDER`,
//! `GROUP_OFFLINE_STORE_MAX_COMPRESSED_BYTES`,
//! `GROUP_OFFLINE_CLEANUP_INTERVAL_MS`, `GROUP_OFFLINE_LOCAL_CACHE_TTL_MS`,
//! `GROUP_OFFLINE_LOCAL_CACHE_MAX_ENTRIES`, `GROUP_ROTATION_GRACE_WINDOW_MS`).
//! Owned by the caller (typically `kiyeovo-node`'s config) and threaded
//! through rather than hardcoded.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct GroupOfflineConfig {
    /// A sender-epoch bucket entry older than this is dropped before a put
    /// or poll ever looks at it.
    pub message_ttl_ms: u64,
    /// Per-sender-epoch bucket roll cap: unlike the direct offline store,
    /// which refuses new writes at its cap, a group bucket trims its
    /// oldest message to make room (spec §4.5, §9 "document and keep as
    /// specified").
    pub max_messages_per_sender: usize,
    /// A put whose gzip-compressed store would exceed this size is
    /// refused rather than silently truncated.
    pub store_max_compressed_bytes: usize,
    /// How often the scheduler's cleanup loop sweeps for retireable
    /// epochs.
    pub cleanup_interval: Duration,
    /// TTL for the in-memory bucket-store cache.
    pub local_cache_ttl: Duration,
    /// Entry cap for the in-memory bucket-store cache; eviction beyond
    /// this is LRU, independent of TTL.
    pub local_cache_max_entries: usize,
    /// How long after an epoch's `used_until` a message in that epoch is
    /// still accepted, before the epoch becomes eligible for retirement.
    pub rotation_grace_window_ms: u64,
}

impl Default for GroupOfflineConfig {
    fn default() -> Self {
        Self {
            message_ttl_ms: 14 * 24 * 60 * 60 * 1000,
            max_messages_per_sender: 500,
            store_max_compressed_bytes: 2 * 1024 * 1024,
            cleanup_interval: Duration::from_secs(600),
            local_cache_ttl: Duration::from_secs(300),
            local_cache_max_entries: 512,
            rotation_grace_window_ms: 2 * 24 * 60 * 60 * 1000,
        }
    }
}
