//! Offline Cursor (group) and Member Seq queries (spec §3, §4.5).
//! Invariant I2: `highest_seen_seq` is monotonically nondecreasing.

use rusqlite::{params, Connection};

use kiyeovo_types::{GroupId, PeerId};

use crate::Result;

pub fn get_cursor(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    sender_peer_id: &PeerId,
) -> Result<Option<(u64, Option<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT last_read_ts, last_read_message_id FROM group_offline_cursors
         WHERE group_id = ?1 AND key_version = ?2 AND sender_peer_id = ?3",
    )?;
    let mut rows = stmt.query_map(
        params![
            group_id.as_bytes().as_slice(),
            key_version as i64,
            sender_peer_id.as_slice()
        ],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, Option<String>>(1)?)),
    )?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn upsert_cursor(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    sender_peer_id: &PeerId,
    last_read_ts: u64,
    last_read_message_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO group_offline_cursors (group_id, key_version, sender_peer_id, last_read_ts, last_read_message_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (group_id, key_version, sender_peer_id) DO UPDATE SET
            last_read_ts = excluded.last_read_ts,
            last_read_message_id = excluded.last_read_message_id",
        params![
            group_id.as_bytes().as_slice(),
            key_version as i64,
            sender_peer_id.as_slice(),
            last_read_ts as i64,
            last_read_message_id,
        ],
    )?;
    Ok(())
}

pub fn delete_cursors_for_epoch(conn: &Connection, group_id: &GroupId, key_version: u64) -> Result<()> {
    conn.execute(
        "DELETE FROM group_offline_cursors WHERE group_id = ?1 AND key_version = ?2",
        params![group_id.as_bytes().as_slice(), key_version as i64],
    )?;
    Ok(())
}

pub fn get_member_seq(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    sender_peer_id: &PeerId,
) -> Result<u64> {
    let seq: Option<i64> = conn.query_row(
        "SELECT highest_seen_seq FROM group_member_seqs
         WHERE group_id = ?1 AND key_version = ?2 AND sender_peer_id = ?3",
        params![
            group_id.as_bytes().as_slice(),
            key_version as i64,
            sender_peer_id.as_slice()
        ],
        |row| row.get(0),
    )
    .ok();
    Ok(seq.unwrap_or(0) as u64)
}

/// Advance the stored `highest_seen_seq`. The caller must already have
/// checked `new_seq >= current` (invariant I2) — this function enforces it
/// defensively with `MAX` in SQL so a stray out-of-order call never regresses
/// the value.
pub fn update_member_seq(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    sender_peer_id: &PeerId,
    new_seq: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO group_member_seqs (group_id, key_version, sender_peer_id, highest_seen_seq)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (group_id, key_version, sender_peer_id) DO UPDATE SET
            highest_seen_seq = MAX(highest_seen_seq, excluded.highest_seen_seq)",
        params![
            group_id.as_bytes().as_slice(),
            key_version as i64,
            sender_peer_id.as_slice(),
            new_seq as i64,
        ],
    )?;
    Ok(())
}

pub fn delete_member_seqs_for_epoch(conn: &Connection, group_id: &GroupId, key_version: u64) -> Result<()> {
    conn.execute(
        "DELETE FROM group_member_seqs WHERE group_id = ?1 AND key_version = ?2",
        params![group_id.as_bytes().as_slice(), key_version as i64],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_seq_defaults_to_zero() {
        let conn = crate::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        assert_eq!(get_member_seq(&conn, &gid, 1, &[1u8; 32]).expect("get"), 0);
    }

    #[test]
    fn test_member_seq_monotonic_via_max() {
        let conn = crate::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        let peer = [1u8; 32];
        update_member_seq(&conn, &gid, 1, &peer, 5).expect("update");
        update_member_seq(&conn, &gid, 1, &peer, 3).expect("update stale, ignored");
        assert_eq!(get_member_seq(&conn, &gid, 1, &peer).expect("get"), 5);
        update_member_seq(&conn, &gid, 1, &peer, 9).expect("update");
        assert_eq!(get_member_seq(&conn, &gid, 1, &peer).expect("get"), 9);
    }

    #[test]
    fn test_cursor_roundtrip_and_delete() {
        let conn = crate::open_memory().expect("open");
        let gid = uuid::Uuid::new_v4();
        let peer = [2u8; 32];
        upsert_cursor(&conn, &gid, 1, &peer, 1000, Some("msg-1")).expect("upsert");
        let cursor = get_cursor(&conn, &gid, 1, &peer).expect("get").expect("present");
        assert_eq!(cursor.0, 1000);
        delete_cursors_for_epoch(&conn, &gid, 1).expect("delete");
        assert!(get_cursor(&conn, &gid, 1, &peer).expect("get").is_none());
    }
}
