//! Group Key History queries (spec §3). Append-only; `used_until` is
//! stamped when a newer epoch activates.

use rusqlite::{params, Connection};

use kiyeovo_types::group::GroupKeyHistoryEntry;
use kiyeovo_types::GroupId;

use crate::{DbError, Result};

pub fn append(conn: &Connection, entry: &GroupKeyHistoryEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO group_key_history (group_id, key_version, key, state_hash, used_until)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.group_id.as_bytes().as_slice(),
            entry.key_version as i64,
            entry.key.as_slice(),
            entry.state_hash.as_slice(),
            entry.used_until.map(|u| u as i64),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, group_id: &GroupId, key_version: u64) -> Result<GroupKeyHistoryEntry> {
    conn.query_row(
        "SELECT group_id, key_version, key, state_hash, used_until
         FROM group_key_history WHERE group_id = ?1 AND key_version = ?2",
        params![group_id.as_bytes().as_slice(), key_version as i64],
        row_to_entry,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("group key".into()),
        other => DbError::Sqlite(other),
    })?
}

/// The highest `key_version` recorded for a group — must equal `chat.key_version`
/// (invariant I1).
pub fn latest_version(conn: &Connection, group_id: &GroupId) -> Result<Option<u64>> {
    let version: Option<i64> = conn.query_row(
        "SELECT MAX(key_version) FROM group_key_history WHERE group_id = ?1",
        [group_id.as_bytes().as_slice()],
        |row| row.get(0),
    )?;
    Ok(version.map(|v| v as u64))
}

/// All epochs with `key_version <= max_version`, ascending — used by C6's
/// receiver to enumerate the epochs it needs to poll.
pub fn list_up_to(
    conn: &Connection,
    group_id: &GroupId,
    max_version: u64,
) -> Result<Vec<GroupKeyHistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT group_id, key_version, key, state_hash, used_until
         FROM group_key_history WHERE group_id = ?1 AND key_version <= ?2 ORDER BY key_version",
    )?;
    let rows = stmt
        .query_map(params![group_id.as_bytes().as_slice(), max_version as i64], row_to_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Stamp `used_until` on the previous epoch when a new one activates (spec
/// §4.4: "The rotated-out key is retained in history; its used_until is
/// stamped when the next rotation occurs").
pub fn stamp_used_until(
    conn: &Connection,
    group_id: &GroupId,
    key_version: u64,
    used_until: u64,
) -> Result<()> {
    conn.execute(
        "UPDATE group_key_history SET used_until = ?1 WHERE group_id = ?2 AND key_version = ?3",
        params![used_until as i64, group_id.as_bytes().as_slice(), key_version as i64],
    )?;
    Ok(())
}

/// Delete a retired epoch's key-history row (spec §4.5 "Epoch retirement").
pub fn delete(conn: &Connection, group_id: &GroupId, key_version: u64) -> Result<()> {
    conn.execute(
        "DELETE FROM group_key_history WHERE group_id = ?1 AND key_version = ?2",
        params![group_id.as_bytes().as_slice(), key_version as i64],
    )?;
    Ok(())
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<GroupKeyHistoryEntry>> {
    let group_id: Vec<u8> = row.get(0)?;
    let key: Vec<u8> = row.get(2)?;
    let state_hash: Vec<u8> = row.get(3)?;
    let used_until: Option<i64> = row.get(4)?;
    Ok((|| -> Result<GroupKeyHistoryEntry> {
        Ok(GroupKeyHistoryEntry {
            group_id: uuid::Uuid::from_slice(&group_id)
                .map_err(|e| DbError::Serialization(e.to_string()))?,
            key_version: row.get::<_, i64>(1)? as u64,
            key: key.try_into().map_err(|_| DbError::Serialization("key".into()))?,
            state_hash: state_hash
                .try_into()
                .map_err(|_| DbError::Serialization("state_hash".into()))?,
            used_until: used_until.map(|u| u as u64),
        })
    })())
}
