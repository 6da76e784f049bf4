//! Tunables for the direct offline engine (spec §6 glossary:
//! `MAX_MESSAGES_PER_STORE`, `MESSAGE_TTL`). Owned by the caller (typically
//! `kiyeovo-node`'s config) and threaded through rather than hardcoded, so
//! a deployment can size its buckets independently of this crate.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct OfflineConfig {
    /// A put is refused once the store already holds this many messages
    /// (spec §4.3 "Put algorithm").
    pub max_messages_per_store: usize,
    /// How long the local mirror of our own writes stays authoritative
    /// before a put must re-fetch from the DHT.
    pub mirror_ttl: Duration,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            max_messages_per_store: 200,
            mirror_ttl: Duration::from_secs(300),
        }
    }
}
