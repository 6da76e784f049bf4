//! Identity envelope queries (spec §3, §4.1).

use rusqlite::{params, Connection};
use kiyeovo_types::identity::IdentityEnvelope;

use crate::{DbError, Result};

const KIND_PASSWORD: &str = "password";
const KIND_RECOVERY: &str = "recovery";

/// Insert or replace the password-derived identity envelope.
pub fn upsert_password_envelope(conn: &Connection, env: &IdentityEnvelope) -> Result<()> {
    upsert(conn, env, KIND_PASSWORD)
}

/// Insert or replace the recovery-phrase-derived identity envelope.
pub fn upsert_recovery_envelope(conn: &Connection, env: &IdentityEnvelope) -> Result<()> {
    upsert(conn, env, KIND_RECOVERY)
}

fn upsert(conn: &Connection, env: &IdentityEnvelope, kind: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO identity_envelopes (peer_id, kind, salt, nonce, ciphertext, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (peer_id, kind) DO UPDATE SET
            salt = excluded.salt,
            nonce = excluded.nonce,
            ciphertext = excluded.ciphertext,
            created_at = excluded.created_at",
        params![
            env.peer_id.as_slice(),
            kind,
            env.salt.as_slice(),
            env.nonce.as_slice(),
            env.ciphertext,
            env.created_at as i64,
        ],
    )?;
    Ok(())
}

fn load(conn: &Connection, kind: &str) -> Result<IdentityEnvelope> {
    conn.query_row(
        "SELECT peer_id, salt, nonce, ciphertext, created_at FROM identity_envelopes WHERE kind = ?1",
        [kind],
        |row| {
            let peer_id: Vec<u8> = row.get(0)?;
            let salt: Vec<u8> = row.get(1)?;
            let nonce: Vec<u8> = row.get(2)?;
            Ok((peer_id, salt, nonce, row.get::<_, Vec<u8>>(3)?, row.get::<_, i64>(4)?))
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("identity envelope".into()),
        other => DbError::Sqlite(other),
    })
    .and_then(|(peer_id, salt, nonce, ciphertext, created_at)| {
        Ok(IdentityEnvelope {
            peer_id: super::peer_id_from_row(peer_id)?,
            salt: salt
                .try_into()
                .map_err(|_| DbError::Serialization("salt must be 32 bytes".into()))?,
            nonce: nonce
                .try_into()
                .map_err(|_| DbError::Serialization("nonce must be 12 bytes".into()))?,
            ciphertext,
            created_at: created_at as u64,
        })
    })
}

/// Load the password-derived identity envelope, if one has been saved.
pub fn load_password_envelope(conn: &Connection) -> Result<IdentityEnvelope> {
    load(conn, KIND_PASSWORD)
}

/// Load the recovery-phrase-derived identity envelope, if one has been
/// saved.
pub fn load_recovery_envelope(conn: &Connection) -> Result<IdentityEnvelope> {
    load(conn, KIND_RECOVERY)
}
