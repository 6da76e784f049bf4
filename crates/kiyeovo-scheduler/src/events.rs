//! The scheduler's own narrow event-notifier boundary. `kiyeovo-node` wires
//! a concrete implementation on top of its own, broader event-notifier trait
//! (spec §6, §9: only `kiyeovo-node` ever names a concrete UI/IPC type).

use kiyeovo_group::GroupEvent;
use kiyeovo_types::message::Message;
use kiyeovo_types::offline_group::GapWarning;
use kiyeovo_types::PeerId;

/// Callbacks the scheduler fires as it observes state changes during a
/// sweep. Every method is a plain notification — none of them are allowed
/// to fail the sweep, so implementations should not block or panic.
pub trait SchedulerEvents: Send + Sync {
    fn on_message_received(&self, message: &Message);
    fn on_control_dispatched(&self, event: &GroupEvent);
    fn on_gap_warning(&self, warning: &GapWarning);
    fn on_session_evicted(&self, peer_id: PeerId);
    fn nudge_peer(&self, peer_id: PeerId);
}

/// A [`SchedulerEvents`] that drops every notification, for tests and
/// embedders that don't care to observe the sweep.
pub struct NullEvents;

impl SchedulerEvents for NullEvents {
    fn on_message_received(&self, _message: &Message) {}
    fn on_control_dispatched(&self, _event: &GroupEvent) {}
    fn on_gap_warning(&self, _warning: &GapWarning) {}
    fn on_session_evicted(&self, _peer_id: PeerId) {}
    fn nudge_peer(&self, _peer_id: PeerId) {}
}
