//! Group control-plane tunables (spec §4.4, Glossary constants).

/// Milliseconds. An invite not answered within this window lapses to
/// `invite_expired` the next time it is touched (spec §4.4 state machine:
/// "invited_pending -- ttl --> invite_expired").
pub const GROUP_INVITE_LIFETIME_MS: u64 = 14 * 24 * 60 * 60 * 1000;

/// A group may have at most this many participants, creator included.
pub const GROUP_MAX_MEMBERS: usize = 200;

/// Milliseconds. How long a control-plane message (ack, welcome, state
/// update) stays live in its carrier's offline bucket before expiring.
pub const GROUP_ACK_MESSAGE_TTL_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy)]
pub struct GroupConfig {
    pub invite_lifetime_ms: u64,
    pub max_members: usize,
    /// Invites are fanned out this many at a time (spec §4.4: "fanned out
    /// in batches of 3").
    pub invite_batch_size: usize,
    pub ack_ttl_ms: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            invite_lifetime_ms: GROUP_INVITE_LIFETIME_MS,
            max_members: GROUP_MAX_MEMBERS,
            invite_batch_size: 3,
            ack_ttl_ms: GROUP_ACK_MESSAGE_TTL_MS,
        }
    }
}
