//! Tunables for the four background sweeps (spec §5, narrative only — no
//! dedicated glossary entry, so the intervals below are this crate's own
//! judgment call rather than a spec-mandated constant).

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// How often to poll every active direct chat's offline bucket.
    pub offline_poll_interval: Duration,
    /// How often to re-publish every outstanding pending ACK.
    pub pending_ack_interval: Duration,
    /// How often to poll group offline buckets and retire spent epochs.
    pub group_offline_interval: Duration,
    /// How often to sweep `SessionMap` for idle eviction and rotation.
    pub session_sweep_interval: Duration,
    /// Idle time before a direct session is evicted (spec §5: 5 minutes).
    pub session_ttl_secs: u64,
    /// `messageCount` threshold that triggers a rotation nudge (spec §4.2).
    pub session_rotation_threshold: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            offline_poll_interval: Duration::from_secs(30),
            pending_ack_interval: Duration::from_secs(60),
            group_offline_interval: Duration::from_secs(30),
            session_sweep_interval: Duration::from_secs(60),
            session_ttl_secs: 300,
            session_rotation_threshold: 1000,
        }
    }
}
