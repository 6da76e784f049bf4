//! The in-memory `Session` entity (spec §3, §4.2). Never persisted — held
//! only by `kiyeovo-session` for the process lifetime.

use zeroize::Zeroize;

use crate::PeerId;

/// A live direct-session record. Dropped (and zeroed) on TTL expiry,
/// rotation, or secure shutdown.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Session {
    #[zeroize(skip)]
    pub peer_id: PeerId,
    pub sending_key: [u8; 32],
    pub receiving_key: [u8; 32],
    pub ephemeral_priv: [u8; 32],
    #[zeroize(skip)]
    pub message_count: u64,
    #[zeroize(skip)]
    pub last_used: u64,
    #[zeroize(skip)]
    pub created_at: u64,
}

impl Session {
    /// Whether this session has been idle long enough to evict (spec §5:
    /// 5-minute idle TTL).
    pub fn is_expired(&self, now: u64, ttl_secs: u64) -> bool {
        now.saturating_sub(self.last_used) >= ttl_secs
    }

    /// Whether the message counter has crossed the rotation threshold.
    pub fn needs_rotation(&self, threshold: u64) -> bool {
        self.message_count >= threshold
    }
}
