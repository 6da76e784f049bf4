//! Epoch retirement (spec §4.5 "Epoch retirement"): once an epoch's
//! `used_until` plus the rotation grace window has passed, and every
//! roster member has read far enough into it, its cursors, member-seq
//! rows, key-history entry, and cached bucket copies are pruned so the
//! group's local state does not grow without bound across rotations.

use rusqlite::Connection;

use kiyeovo_db::queries::{group_key_history, group_offline};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::groupinfo::GroupInfoVersioned;
use kiyeovo_types::{GroupId, PeerId};

use crate::cache::BucketCache;
use crate::GroupOfflineError;

/// Retire every epoch `< current_key_version` whose grace window has
/// elapsed and whose roster has fully caught up, returning the retired
/// `key_version`s.
///
/// `roster` is the current membership, used as the fallback completeness
/// check when no `group-info-v` record pinning sender boundaries for the
/// epoch is reachable.
pub async fn retire_eligible_epochs(
    dht: &dyn DhtClient,
    conn: &Connection,
    cache: &mut BucketCache,
    group_id: GroupId,
    creator_sign_pub: &[u8; 32],
    roster: &[PeerId],
    current_key_version: u64,
    grace_window_ms: u64,
    now: u64,
) -> Result<Vec<u64>, GroupOfflineError> {
    let mut retired = Vec::new();

    for epoch in group_key_history::list_up_to(conn, &group_id, current_key_version)? {
        if epoch.key_version >= current_key_version {
            continue;
        }
        let Some(used_until) = epoch.used_until else { continue };
        if now < used_until + grace_window_ms {
            continue;
        }

        let boundary_record =
            kiyeovo_groupinfo::fetch_versioned(dht, group_id, creator_sign_pub, epoch.key_version + 1).await?;
        let eligible = match &boundary_record {
            Some(record) if !record.sender_seq_boundaries.is_empty() => {
                roster_met_boundaries(conn, &group_id, epoch.key_version, roster, record)?
            }
            _ => roster_cursors_caught_up(conn, &group_id, epoch.key_version, roster, used_until + grace_window_ms)?,
        };
        if !eligible {
            continue;
        }

        group_offline::delete_cursors_for_epoch(conn, &group_id, epoch.key_version)?;
        group_offline::delete_member_seqs_for_epoch(conn, &group_id, epoch.key_version)?;
        group_key_history::delete(conn, &group_id, epoch.key_version)?;
        cache.evict_epoch(group_id, epoch.key_version);

        retired.push(epoch.key_version);
    }

    Ok(retired)
}

fn roster_met_boundaries(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    roster: &[PeerId],
    record: &GroupInfoVersioned,
) -> Result<bool, GroupOfflineError> {
    for peer in roster {
        let boundary = record.boundary_for(peer).unwrap_or(0);
        let seen = group_offline::get_member_seq(conn, group_id, key_version, peer)?;
        if seen < boundary {
            return Ok(false);
        }
    }
    Ok(true)
}

fn roster_cursors_caught_up(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    roster: &[PeerId],
    deadline: u64,
) -> Result<bool, GroupOfflineError> {
    for peer in roster {
        let caught_up = group_offline::get_cursor(conn, group_id, key_version, peer)?
            .map(|(last_read_ts, _)| last_read_ts >= deadline)
            .unwrap_or(false);
        if !caught_up {
            return Ok(false);
        }
    }
    Ok(true)
}
