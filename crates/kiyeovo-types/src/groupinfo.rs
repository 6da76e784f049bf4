//! The two Group Info DHT record shapes (spec §4.6): a "latest" pointer and
//! an immutable versioned record, both signed by the group's creator and
//! chained by `stateHash`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::group::RosterMember;
use crate::{GroupId, PeerId};

/// `/kiyeovo-group-info-latest/{groupId}/{creator_sign_pub}` — monotonic in
/// `latest_version`; at equal version only a byte-identical re-publish is
/// accepted (spec §4.7 table).
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInfoLatest {
    pub group_id: GroupId,
    pub latest_version: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub latest_state_hash: [u8; 32],
    pub last_updated: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub creator_signature: [u8; 64],
}

/// `/kiyeovo-group-info-v/{groupId}/{creator_sign_pub}/{version}` — immutable
/// once published; a hash chain back to `version - 1` (spec §4.6).
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInfoVersioned {
    pub group_id: GroupId,
    pub version: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub prev_version_hash: [u8; 32],
    pub members: Vec<RosterMember>,
    pub member_signing_pub_keys: HashMap<String, [u8; 32]>,
    pub activated_at: u64,
    /// Per-sender `seq` cap for epoch `version - 1` (spec Glossary: "Sender
    /// boundary"). Keyed by hex-encoded `PeerId` for stable JSON maps.
    pub sender_seq_boundaries: HashMap<String, u64>,
    #[serde_as(as = "serde_with::Bytes")]
    pub state_hash: [u8; 32],
    #[serde_as(as = "serde_with::Bytes")]
    pub creator_signature: [u8; 64],
}

impl GroupInfoVersioned {
    /// Look up the `seq` boundary pinned for a given sender, if the creator
    /// has attested one.
    pub fn boundary_for(&self, peer_id: &PeerId) -> Option<u64> {
        self.sender_seq_boundaries
            .get(&hex::encode(peer_id))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_for_lookup() {
        let mut boundaries = HashMap::new();
        let peer = [1u8; 32];
        boundaries.insert(hex::encode(peer), 10u64);
        let record = GroupInfoVersioned {
            group_id: uuid::Uuid::new_v4(),
            version: 2,
            prev_version_hash: [0u8; 32],
            members: vec![],
            member_signing_pub_keys: HashMap::new(),
            activated_at: 0,
            sender_seq_boundaries: boundaries,
            state_hash: [0u8; 32],
            creator_signature: [0u8; 64],
        };
        assert_eq!(record.boundary_for(&peer), Some(10));
        assert_eq!(record.boundary_for(&[2u8; 32]), None);
    }
}
