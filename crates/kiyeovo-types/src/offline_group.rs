//! The group offline epoch bucket wire format (spec §4.5).
//!
//! Each `(group, epoch, sender)` has its own bucket at
//! `/kiyeovo-group-offline/{groupId}/{keyVersion}/{sender_sign_pub_b64url}`,
//! so a sender's monotonic `seq` is local to its own writes.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{GroupId, MessageId, PeerId};

/// One signed message in a sender's (group, epoch) bucket.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupContentMessage {
    pub group_id: GroupId,
    pub key_version: u64,
    pub sender_peer_id: PeerId,
    pub message_id: MessageId,
    /// Strictly increasing per `(group, sender, epoch)` (invariant I4).
    pub seq: u64,
    pub encrypted_content: Vec<u8>,
    #[serde_as(as = "serde_with::Bytes")]
    pub nonce: [u8; 24],
    pub timestamp: u64,
    pub message_type: crate::message::MessageType,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

impl GroupContentMessage {
    /// The fields a signature must cover, per spec §4.5 (everything but the
    /// signature itself).
    pub fn signed_fields(&self) -> GroupContentSignedFields<'_> {
        GroupContentSignedFields {
            group_id: &self.group_id,
            key_version: self.key_version,
            sender_peer_id: &self.sender_peer_id,
            message_id: &self.message_id,
            seq: self.seq,
            encrypted_content: &self.encrypted_content,
            nonce: &self.nonce,
            timestamp: self.timestamp,
        }
    }
}

/// Borrowed view of the fields a sender signs over a `GroupContentMessage`.
#[serde_as]
#[derive(Serialize)]
pub struct GroupContentSignedFields<'a> {
    pub group_id: &'a GroupId,
    pub key_version: u64,
    pub sender_peer_id: &'a PeerId,
    pub message_id: &'a MessageId,
    pub seq: u64,
    pub encrypted_content: &'a [u8],
    #[serde_as(as = "serde_with::Bytes")]
    pub nonce: &'a [u8; 24],
    pub timestamp: u64,
}

/// The value published at a `(group, epoch, sender)` bucket key. Unlike the
/// direct store, there is no top-level signature — each message is signed
/// individually, and `version` is used only for the put-merge-retry race
/// described in spec §4.5.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupOfflineStore {
    pub messages: Vec<GroupContentMessage>,
    pub version: u64,
    pub last_updated: u64,
    pub highest_seq: u64,
}

impl GroupOfflineStore {
    pub fn empty() -> Self {
        GroupOfflineStore {
            messages: Vec::new(),
            version: 0,
            last_updated: 0,
            highest_seq: 0,
        }
    }

    /// Recompute `highest_seq` from the current message set (spec §4.5:
    /// "recompute highestSeq" after every append/trim).
    pub fn recompute_highest_seq(&mut self) {
        self.highest_seq = self.messages.iter().map(|m| m.seq).max().unwrap_or(0);
    }
}

impl Default for GroupOfflineStore {
    fn default() -> Self {
        Self::empty()
    }
}

/// A non-fatal notice emitted when a receiver observes `seq` skip ahead of
/// `expected` (spec §4.5 step 6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapWarning {
    pub chat_id: crate::ChatId,
    pub group_id: GroupId,
    pub key_version: u64,
    pub sender_peer_id: PeerId,
    pub expected: u64,
    pub actual: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recompute_highest_seq_from_messages() {
        let mut store = GroupOfflineStore::empty();
        assert_eq!(store.highest_seq, 0);
        let msg = |seq: u64| GroupContentMessage {
            group_id: uuid::Uuid::new_v4(),
            key_version: 1,
            sender_peer_id: [0u8; 32],
            message_id: uuid::Uuid::new_v4(),
            seq,
            encrypted_content: vec![],
            nonce: [0u8; 24],
            timestamp: 0,
            message_type: crate::message::MessageType::Text,
            signature: [0u8; 64],
        };
        store.messages.push(msg(1));
        store.messages.push(msg(4));
        store.messages.push(msg(2));
        store.recompute_highest_seq();
        assert_eq!(store.highest_seq, 4);
    }
}
