//! Sender-seq-boundary computation (spec §4.6: "`senderSeqBoundaries[peer]`
//! equals the creator's best knowledge of the highest `seq` seen from `peer`
//! in epoch `v-1`, updated from observed cursors plus the creator's own send
//! counter").

use std::collections::BTreeMap;

use rusqlite::Connection;

use kiyeovo_db::queries::group_offline;
use kiyeovo_types::{GroupId, PeerId};

use crate::GroupInfoError;

/// Boundaries for the epoch being retired by this rotation (`new_version -
/// 1`). Empty for a group's first version, which has no prior epoch.
pub fn compute_sender_seq_boundaries(
    conn: &Connection,
    group_id: &GroupId,
    new_version: u64,
    roster_peer_ids: &[PeerId],
    own_peer_id: &PeerId,
    own_highest_seq: u64,
) -> Result<BTreeMap<String, u64>, GroupInfoError> {
    let mut boundaries = BTreeMap::new();
    let Some(retiring_epoch) = new_version.checked_sub(1) else {
        return Ok(boundaries);
    };
    if new_version == 0 {
        return Ok(boundaries);
    }

    for peer in roster_peer_ids {
        let seq = if peer == own_peer_id {
            own_highest_seq
        } else {
            group_offline::get_member_seq(conn, group_id, retiring_epoch, peer)?
        };
        boundaries.insert(hex::encode(peer), seq);
    }
    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_version_has_no_boundaries() {
        let conn = kiyeovo_db::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        let boundaries =
            compute_sender_seq_boundaries(&conn, &gid, 0, &[[1u8; 32]], &[1u8; 32], 5).expect("compute");
        assert!(boundaries.is_empty());
    }

    #[test]
    fn test_boundaries_mix_own_counter_and_observed_cursors() {
        let conn = kiyeovo_db::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        let creator = [1u8; 32];
        let member = [2u8; 32];
        group_offline::update_member_seq(&conn, &gid, 0, &member, 7).expect("seed");

        let boundaries =
            compute_sender_seq_boundaries(&conn, &gid, 1, &[creator, member], &creator, 12)
                .expect("compute");
        assert_eq!(boundaries.get(&hex::encode(creator)), Some(&12));
        assert_eq!(boundaries.get(&hex::encode(member)), Some(&7));
    }
}
