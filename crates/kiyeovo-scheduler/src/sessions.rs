//! Session map sweep: evict idle direct sessions past their TTL and flag
//! any that crossed the rotation threshold so the caller can nudge a
//! fresh key exchange (spec §4.2, §5, §9: `SessionMap` is owned, not
//! behind a `Mutex`, so this sweep takes `&mut SessionMap` directly
//! rather than reaching through shared state).

use kiyeovo_session::SessionMap;

use crate::config::SchedulerConfig;
use crate::events::SchedulerEvents;

/// Evict idle sessions and notify on anything needing rotation.
///
/// Eviction just drops the `Session` (its `Zeroize` impl wipes key
/// material on drop); rotation is only ever a nudge — the scheduler does
/// not perform the key exchange itself.
pub fn sweep_sessions(
    sessions: &mut SessionMap,
    config: &SchedulerConfig,
    events: &dyn SchedulerEvents,
    now: u64,
) {
    for evicted in sessions.evict_expired(now, config.session_ttl_secs) {
        events.on_session_evicted(evicted.peer_id);
    }

    for peer_id in sessions.needing_rotation(config.session_rotation_threshold) {
        events.nudge_peer(peer_id);
    }
}
