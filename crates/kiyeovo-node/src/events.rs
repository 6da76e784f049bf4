//! The node's event-notifier boundary (spec §6 "Collaborator interfaces",
//! §9: "Expose the password prompt and event notifiers as trait/interface
//! objects with a fixed capability set `{prompt, on_message_received,
//! on_chat_created, on_group_activated, nudge_peer}`"). A typed trait
//! rather than a JSON-broadcast bus: Kiyeovo has no IPC/UI surface of its
//! own (out of scope per spec Non-goals), so there is nothing to
//! serialize to — only a direct embedder callback.

use kiyeovo_group::GroupEvent;
use kiyeovo_scheduler::SchedulerEvents;
use kiyeovo_types::message::Message;
use kiyeovo_types::offline_group::GapWarning;
use kiyeovo_types::{ChatId, GroupId, PeerId};

/// The fixed capability set an embedder (UI, test harness) implements to
/// observe the engine.
pub trait NodeEvents: Send + Sync {
    fn on_message_received(&self, message: &Message);
    fn on_chat_created(&self, chat_id: ChatId);
    fn on_group_activated(&self, group_id: GroupId);
    fn nudge_peer(&self, peer_id: PeerId);

    /// Not in spec §9's minimal set, but every scheduler sweep needs
    /// somewhere to report what it saw; defaulted to a no-op so
    /// embedders only override what they care about.
    fn on_gap_warning(&self, _warning: &GapWarning) {}
    fn on_session_evicted(&self, _peer_id: PeerId) {}
}

/// A [`NodeEvents`] that drops every notification.
pub struct NullNodeEvents;

impl NodeEvents for NullNodeEvents {
    fn on_message_received(&self, _message: &Message) {}
    fn on_chat_created(&self, _chat_id: ChatId) {}
    fn on_group_activated(&self, _group_id: GroupId) {}
    fn nudge_peer(&self, _peer_id: PeerId) {}
}

/// Adapts a [`NodeEvents`] embedder callback into the narrower
/// [`SchedulerEvents`] boundary `kiyeovo-scheduler` calls during its
/// sweeps, translating `GroupEvent` into the chat/group lifecycle
/// notifications the embedder actually asked for.
pub struct SchedulerEventsAdapter<E: NodeEvents + ?Sized> {
    inner: std::sync::Arc<E>,
}

impl<E: NodeEvents + ?Sized> SchedulerEventsAdapter<E> {
    pub fn new(inner: std::sync::Arc<E>) -> Self {
        Self { inner }
    }
}

impl<E: NodeEvents + ?Sized> SchedulerEvents for SchedulerEventsAdapter<E> {
    fn on_message_received(&self, message: &Message) {
        self.inner.on_message_received(message);
    }

    fn on_control_dispatched(&self, event: &GroupEvent) {
        match event {
            GroupEvent::GroupActivated { group_id } => self.inner.on_group_activated(*group_id),
            GroupEvent::InviteReceived { .. }
            | GroupEvent::InviteAnswered { .. }
            | GroupEvent::ControlAcknowledged { .. } => {}
        }
    }

    fn on_gap_warning(&self, warning: &GapWarning) {
        self.inner.on_gap_warning(warning);
    }

    fn on_session_evicted(&self, peer_id: PeerId) {
        self.inner.on_session_evicted(peer_id);
    }

    fn nudge_peer(&self, peer_id: PeerId) {
        self.inner.nudge_peer(peer_id);
    }
}
