//! Per-peer key-exchange rate limiting (spec §4.2 step 2, §9: "per-peer
//! rate-limit counters" among the required concurrency primitives).
//!
//! A fixed-window counter per initiator, the same `HashMap<PeerId, _>`
//! shape as [`kiyeovo_session::SessionMap`]: a plain value held by whatever
//! owns it, never behind its own internal `Mutex`.

use std::collections::HashMap;

use kiyeovo_types::PeerId;

struct Window {
    started_at: u64,
    count: u32,
}

/// Tracks how many key-exchange inits each peer has sent us within the
/// current window, rejecting once `max_attempts` is exceeded until the
/// window rolls over.
pub struct KxRateLimiter {
    windows: HashMap<PeerId, Window>,
    window_secs: u64,
    max_attempts: u32,
}

impl KxRateLimiter {
    pub fn new(window_secs: u64, max_attempts: u32) -> Self {
        Self {
            windows: HashMap::new(),
            window_secs,
            max_attempts,
        }
    }

    /// Record one key-exchange attempt from `peer_id` at `now`. Returns
    /// `Ok(())` if it is within the window's budget, or `Err(retry_after_secs)`
    /// if the peer has exceeded `max_attempts` for the current window.
    pub fn check_and_record(&mut self, peer_id: PeerId, now: u64) -> Result<(), u64> {
        let window = self.windows.entry(peer_id).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.saturating_sub(window.started_at) >= self.window_secs {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_attempts {
            let retry_after_secs = self.window_secs.saturating_sub(now.saturating_sub(window.started_at));
            return Err(retry_after_secs);
        }

        window.count += 1;
        Ok(())
    }

    /// Drop windows that have not seen an attempt in over `ttl_secs`, so a
    /// long-lived responder does not accumulate one entry per peer it has
    /// ever heard from.
    pub fn evict_expired(&mut self, now: u64, ttl_secs: u64) {
        self.windows.retain(|_, w| now.saturating_sub(w.started_at) < ttl_secs);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
