//! Pending ACK queries (spec §3, §4.4, §9). Invariant I3: a pending ACK for
//! `(group, peer, type)` is unique — insertion upserts the payload.

use rusqlite::{params, Connection};

use kiyeovo_types::group::{PendingAck, PendingAckMessageType};
use kiyeovo_types::{GroupId, PeerId};

use crate::{DbError, Result};

/// Insert or replace the pending row for `(group_id, target_peer_id,
/// message_type)` (spec §3, §9: "a payload is persisted before the first
/// send attempt").
pub fn upsert(conn: &Connection, ack: &PendingAck, now: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO pending_acks (group_id, target_peer_id, message_type, message_id, payload_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (group_id, target_peer_id, message_type) DO UPDATE SET
            message_id = excluded.message_id,
            payload_json = excluded.payload_json,
            created_at = excluded.created_at",
        params![
            ack.group_id.as_bytes().as_slice(),
            ack.target_peer_id.as_slice(),
            message_type_str(ack.message_type),
            ack.message_id,
            ack.payload_json,
            now as i64,
        ],
    )?;
    Ok(())
}

pub fn get(
    conn: &Connection,
    group_id: &GroupId,
    target_peer_id: &PeerId,
    message_type: PendingAckMessageType,
) -> Result<Option<PendingAck>> {
    let mut stmt = conn.prepare(
        "SELECT group_id, target_peer_id, message_type, message_id, payload_json
         FROM pending_acks WHERE group_id = ?1 AND target_peer_id = ?2 AND message_type = ?3",
    )?;
    let mut rows = stmt.query_map(
        params![
            group_id.as_bytes().as_slice(),
            target_peer_id.as_slice(),
            message_type_str(message_type),
        ],
        row_to_ack,
    )?;
    match rows.next() {
        Some(row) => Ok(Some(row??)),
        None => Ok(None),
    }
}

/// Remove a pending row only after its matching ACK has been verified by
/// the caller (spec §4.4 "Control-ACK matching": mismatch is a silent drop).
pub fn remove(
    conn: &Connection,
    group_id: &GroupId,
    target_peer_id: &PeerId,
    message_type: PendingAckMessageType,
) -> Result<()> {
    conn.execute(
        "DELETE FROM pending_acks WHERE group_id = ?1 AND target_peer_id = ?2 AND message_type = ?3",
        params![
            group_id.as_bytes().as_slice(),
            target_peer_id.as_slice(),
            message_type_str(message_type),
        ],
    )?;
    Ok(())
}

/// All pending rows for a group (for the re-publisher, spec §4.4).
pub fn list_for_group(conn: &Connection, group_id: &GroupId) -> Result<Vec<PendingAck>> {
    let mut stmt = conn.prepare(
        "SELECT group_id, target_peer_id, message_type, message_id, payload_json
         FROM pending_acks WHERE group_id = ?1",
    )?;
    let rows = stmt
        .query_map([group_id.as_bytes().as_slice()], row_to_ack)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// All pending rows across every group (the scheduler's re-publish sweep).
pub fn list_all(conn: &Connection) -> Result<Vec<PendingAck>> {
    let mut stmt = conn.prepare(
        "SELECT group_id, target_peer_id, message_type, message_id, payload_json FROM pending_acks",
    )?;
    let rows = stmt
        .query_map([], row_to_ack)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

fn message_type_str(t: PendingAckMessageType) -> &'static str {
    match t {
        PendingAckMessageType::GroupInvite => "group_invite",
        PendingAckMessageType::GroupInviteResponse => "group_invite_response",
        PendingAckMessageType::GroupWelcome => "group_welcome",
        PendingAckMessageType::GroupStateUpdate => "group_state_update",
    }
}

fn row_to_ack(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<PendingAck>> {
    let group_id: Vec<u8> = row.get(0)?;
    let target_peer_id: Vec<u8> = row.get(1)?;
    let message_type: String = row.get(2)?;
    Ok((|| -> Result<PendingAck> {
        Ok(PendingAck {
            group_id: uuid::Uuid::from_slice(&group_id)
                .map_err(|e| DbError::Serialization(e.to_string()))?,
            target_peer_id: target_peer_id
                .try_into()
                .map_err(|_| DbError::Serialization("target_peer_id".into()))?,
            message_type: match message_type.as_str() {
                "group_invite" => PendingAckMessageType::GroupInvite,
                "group_invite_response" => PendingAckMessageType::GroupInviteResponse,
                "group_welcome" => PendingAckMessageType::GroupWelcome,
                "group_state_update" => PendingAckMessageType::GroupStateUpdate,
                other => {
                    return Err(DbError::Serialization(format!("unknown message_type {other}")))
                }
            },
            message_id: row.get(3)?,
            payload_json: row.get(4)?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ack(group_id: GroupId) -> PendingAck {
        PendingAck {
            group_id,
            target_peer_id: [5u8; 32],
            message_type: PendingAckMessageType::GroupWelcome,
            message_id: "m1".to_string(),
            payload_json: "{}".to_string(),
        }
    }

    #[test]
    fn test_upsert_is_unique_per_group_peer_type() {
        let conn = crate::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        let mut ack = sample_ack(gid);
        upsert(&conn, &ack, 100).expect("insert");
        ack.message_id = "m2".to_string();
        upsert(&conn, &ack, 200).expect("upsert replaces payload");

        let loaded = get(&conn, &gid, &ack.target_peer_id, PendingAckMessageType::GroupWelcome)
            .expect("get")
            .expect("present");
        assert_eq!(loaded.message_id, "m2");
        assert_eq!(list_for_group(&conn, &gid).expect("list").len(), 1);
    }

    #[test]
    fn test_remove_deletes_matching_row() {
        let conn = crate::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        let ack = sample_ack(gid);
        upsert(&conn, &ack, 100).expect("insert");
        remove(&conn, &gid, &ack.target_peer_id, PendingAckMessageType::GroupWelcome)
            .expect("remove");
        assert!(get(&conn, &gid, &ack.target_peer_id, PendingAckMessageType::GroupWelcome)
            .expect("get")
            .is_none());
    }
}
