//! Contact (`User`) queries (spec §3).

use rusqlite::{params, Connection};

use kiyeovo_types::contact::User;
use kiyeovo_types::PeerId;

use crate::{DbError, Result};

pub fn upsert(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO contacts (peer_id, username, sign_pub, offline_rsa_pub, handshake_sig, blocked, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (peer_id) DO UPDATE SET
            username = excluded.username,
            sign_pub = excluded.sign_pub,
            offline_rsa_pub = excluded.offline_rsa_pub,
            handshake_sig = excluded.handshake_sig,
            blocked = excluded.blocked",
        params![
            user.peer_id.as_slice(),
            user.username,
            user.sign_pub.as_slice(),
            user.offline_rsa_pub,
            user.handshake_sig.map(|s| s.to_vec()),
            user.blocked as i64,
            user.added_at as i64,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, peer_id: &PeerId) -> Result<User> {
    conn.query_row(
        "SELECT peer_id, username, sign_pub, offline_rsa_pub, handshake_sig, blocked, added_at
         FROM contacts WHERE peer_id = ?1",
        [peer_id.as_slice()],
        row_to_user,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("contact".into()),
        other => DbError::Sqlite(other),
    })
}

pub fn list(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT peer_id, username, sign_pub, offline_rsa_pub, handshake_sig, blocked, added_at
         FROM contacts ORDER BY username",
    )?;
    let rows = stmt
        .query_map([], row_to_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_blocked(conn: &Connection, peer_id: &PeerId, blocked: bool) -> Result<()> {
    conn.execute(
        "UPDATE contacts SET blocked = ?1 WHERE peer_id = ?2",
        params![blocked as i64, peer_id.as_slice()],
    )?;
    Ok(())
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let peer_id: Vec<u8> = row.get(0)?;
    let sign_pub: Vec<u8> = row.get(2)?;
    let handshake_sig: Option<Vec<u8>> = row.get(4)?;
    Ok(User {
        peer_id: peer_id.try_into().unwrap_or([0u8; 32]),
        username: row.get(1)?,
        sign_pub: sign_pub.try_into().unwrap_or([0u8; 32]),
        offline_rsa_pub: row.get(3)?,
        handshake_sig: handshake_sig.and_then(|v| v.try_into().ok()),
        blocked: row.get::<_, i64>(5)? != 0,
        added_at: row.get::<_, i64>(6)? as u64,
    })
}
