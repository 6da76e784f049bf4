//! Group control-plane durable state: Pending ACK, Group Key History, and
//! the roster shape shared by welcome/state-update messages (spec §3, §4.4).

use serde::{Deserialize, Serialize};

use crate::{GroupId, PeerId};

/// The control-message types a Pending ACK row can track (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAckMessageType {
    GroupInvite,
    GroupInviteResponse,
    GroupWelcome,
    GroupStateUpdate,
}

/// A durable row recording that we sent a control message and are awaiting
/// acknowledgement (spec §3: "Created before first send; removed when the
/// matching ACK arrives"). Invariant I3: unique per `(group, peer, type)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingAck {
    pub group_id: GroupId,
    pub target_peer_id: PeerId,
    pub message_type: PendingAckMessageType,
    pub message_id: String,
    pub payload_json: String,
}

/// An append-only row in Group Key History (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupKeyHistoryEntry {
    pub group_id: GroupId,
    pub key_version: u64,
    pub key: [u8; 32],
    pub state_hash: [u8; 32],
    /// Stamped when a newer epoch activates; `None` while this is the
    /// current epoch.
    pub used_until: Option<u64>,
}

/// One member of a group roster, as carried in `GROUP_WELCOME` and
/// `GROUP_STATE_UPDATE` (spec Glossary: "Roster").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RosterMember {
    pub peer_id: PeerId,
    pub username: String,
    pub signing_pub: [u8; 32],
    pub offline_rsa_pub: Vec<u8>,
}

/// The event a `GROUP_STATE_UPDATE` carries: a member joined or left/was
/// kicked, triggering the key rotation described in spec §4.4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterEvent {
    Join,
    Leave,
    Kick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_ack_serde_roundtrip() {
        let ack = PendingAck {
            group_id: uuid::Uuid::new_v4(),
            target_peer_id: [9u8; 32],
            message_type: PendingAckMessageType::GroupWelcome,
            message_id: "m1".to_string(),
            payload_json: "{}".to_string(),
        };
        let json = serde_json::to_string(&ack).expect("serialize");
        let restored: PendingAck = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.message_id, ack.message_id);
        assert_eq!(restored.message_type, PendingAckMessageType::GroupWelcome);
    }
}
