//! `SessionMap`: the live `HashMap<PeerId, Session>` (spec §3, §4.2, §9).

use std::collections::HashMap;

use kiyeovo_types::session::Session;
use kiyeovo_types::PeerId;

/// Owns every live direct session. Held by value by whatever component
/// drives the event loop — never behind a `Mutex` (spec §9).
#[derive(Default)]
pub struct SessionMap {
    sessions: HashMap<PeerId, Session>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.peer_id, session);
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&Session> {
        self.sessions.get(peer_id)
    }

    pub fn get_mut(&mut self, peer_id: &PeerId) -> Option<&mut Session> {
        self.sessions.get_mut(peer_id)
    }

    pub fn remove(&mut self, peer_id: &PeerId) -> Option<Session> {
        self.sessions.remove(peer_id)
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.sessions.contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove and return every session idle for at least `ttl_secs` (spec
    /// §5: 5-minute idle TTL). Eviction itself is driven by the scheduler
    /// (C9); this just performs the sweep when asked.
    pub fn evict_expired(&mut self, now: u64, ttl_secs: u64) -> Vec<Session> {
        let stale: Vec<PeerId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_expired(now, ttl_secs))
            .map(|(peer_id, _)| *peer_id)
            .collect();

        stale
            .into_iter()
            .filter_map(|peer_id| self.sessions.remove(&peer_id))
            .collect()
    }

    /// Peer ids whose session has crossed the rotation threshold (spec
    /// §4.2: "messageCount >= threshold triggers a new key exchange").
    pub fn needing_rotation(&self, threshold: u64) -> Vec<PeerId> {
        self.sessions
            .iter()
            .filter(|(_, session)| session.needs_rotation(threshold))
            .map(|(peer_id, _)| *peer_id)
            .collect()
    }
}
