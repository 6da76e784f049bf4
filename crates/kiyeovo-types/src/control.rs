//! The group control-plane message variants (spec §4.4, §9: "Sum types over
//! inheritance"). One tagged enum, one dispatcher in `kiyeovo-group`.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::group::{RosterEvent, RosterMember};
use crate::{GroupId, PeerId};

/// An invite to join a group (spec §4.4 "Lifecycle").
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInvite {
    pub group_id: GroupId,
    pub invite_id: String,
    pub group_name: String,
    pub expires_at: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub creator_signature: [u8; 64],
}

/// The invitee's answer to a `GroupInvite` (spec §4.4 "Invitee path").
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInviteResponse {
    pub group_id: GroupId,
    pub invite_id: String,
    pub accept: bool,
    pub message_id: String,
    pub timestamp: u64,
    pub responder_peer_id: PeerId,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

/// Sent by the creator to a newly-accepted joiner (spec §4.4 "Creator's
/// response handling").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupWelcome {
    pub group_id: GroupId,
    pub group_name: String,
    pub key_version: u64,
    /// The new epoch key, RSA-wrapped under the joiner's offline RSA key.
    pub encrypted_group_key: Vec<u8>,
    pub roster: Vec<RosterMember>,
    pub group_info_latest_dht_key: String,
    pub message_id: String,
}

/// Sent by the creator to every existing member on join/leave/kick (spec
/// §4.4 "Key rotation").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupStateUpdate {
    pub group_id: GroupId,
    pub event: RosterEvent,
    pub key_version: u64,
    pub encrypted_group_key: Vec<u8>,
    pub roster: Vec<RosterMember>,
    pub target_peer_id: PeerId,
    pub message_id: String,
}

/// The ack type named by a `GroupControlAck` (spec §4.4 "Control-ACK
/// matching").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckedMessageType {
    GroupWelcome,
    GroupStateUpdate,
}

/// Acknowledges receipt of a `GROUP_WELCOME` or `GROUP_STATE_UPDATE`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupControlAck {
    pub group_id: GroupId,
    pub acked_message_type: AckedMessageType,
    pub acked_message_id: String,
}

/// Acknowledges receipt of a `GroupInviteResponse`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInviteResponseAck {
    pub group_id: GroupId,
    pub acked_message_id: String,
}

/// Acknowledges receipt of a `GroupInvite` (spec §4.4: "Respond to the
/// creator with GROUP_INVITE_DELIVERED_ACK").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInviteDeliveredAck {
    pub group_id: GroupId,
    pub invite_id: String,
}

/// The tagged union of every group control-plane message (spec §9).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GroupControlMessage {
    #[serde(rename = "GROUP_INVITE")]
    Invite(GroupInvite),
    #[serde(rename = "GROUP_INVITE_RESPONSE")]
    InviteResponse(GroupInviteResponse),
    #[serde(rename = "GROUP_WELCOME")]
    Welcome(GroupWelcome),
    #[serde(rename = "GROUP_STATE_UPDATE")]
    StateUpdate(GroupStateUpdate),
    #[serde(rename = "GROUP_CONTROL_ACK")]
    ControlAck(GroupControlAck),
    #[serde(rename = "GROUP_INVITE_RESPONSE_ACK")]
    InviteResponseAck(GroupInviteResponseAck),
    #[serde(rename = "GROUP_INVITE_DELIVERED_ACK")]
    InviteDeliveredAck(GroupInviteDeliveredAck),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_message_tag_roundtrip() {
        let msg = GroupControlMessage::InviteDeliveredAck(GroupInviteDeliveredAck {
            group_id: uuid::Uuid::new_v4(),
            invite_id: "abc".to_string(),
        });
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "GROUP_INVITE_DELIVERED_ACK");
        let restored: GroupControlMessage = serde_json::from_value(json).expect("deserialize");
        match restored {
            GroupControlMessage::InviteDeliveredAck(ack) => assert_eq!(ack.invite_id, "abc"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_welcome_roundtrip() {
        let msg = GroupControlMessage::Welcome(GroupWelcome {
            group_id: uuid::Uuid::new_v4(),
            group_name: "team".to_string(),
            key_version: 1,
            encrypted_group_key: vec![1, 2, 3],
            roster: vec![],
            group_info_latest_dht_key: "/kiyeovo-group-info-latest/...".to_string(),
            message_id: "w1".to_string(),
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let restored: GroupControlMessage = serde_json::from_str(&json).expect("deserialize");
        match restored {
            GroupControlMessage::Welcome(w) => assert_eq!(w.key_version, 1),
            _ => panic!("wrong variant"),
        }
    }
}
