//! Chat queries (spec §3, §4.4 state machine).

use rusqlite::{params, Connection};

use kiyeovo_types::chat::{Chat, ChatStatus, ChatType, GroupStatus};
use kiyeovo_types::{ChatId, GroupId, PeerId};

use crate::{DbError, Result};

pub fn insert(conn: &Connection, chat: &Chat) -> Result<()> {
    conn.execute(
        "INSERT INTO chats (
            id, chat_type, name, peer_id, created_by, status, group_id, group_creator,
            group_status, key_version, offline_bucket_secret, offline_last_read_ts,
            offline_last_ack_sent, trusted_out_of_band, muted, participants_json
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            chat.id.as_bytes().as_slice(),
            chat_type_str(chat.chat_type),
            chat.name,
            chat.peer_id.map(|p| p.to_vec()),
            chat.created_by.as_slice(),
            chat_status_str(chat.status),
            chat.group_id.map(|g| g.as_bytes().to_vec()),
            chat.group_creator.map(|p| p.to_vec()),
            chat.group_status.map(group_status_str),
            chat.key_version as i64,
            chat.offline_bucket_secret.map(|s| s.to_vec()),
            chat.offline_last_read_ts as i64,
            chat.offline_last_ack_sent as i64,
            chat.trusted_out_of_band as i64,
            chat.muted as i64,
            serde_json::to_string(&chat.participants)
                .map_err(|e| DbError::Serialization(e.to_string()))?,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &ChatId) -> Result<Chat> {
    conn.query_row(
        "SELECT id, chat_type, name, peer_id, created_by, status, group_id, group_creator,
                group_status, key_version, offline_bucket_secret, offline_last_read_ts,
                offline_last_ack_sent, trusted_out_of_band, muted, participants_json
         FROM chats WHERE id = ?1",
        [id.as_bytes().as_slice()],
        row_to_chat,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("chat".into()),
        other => DbError::Sqlite(other),
    })?
}

/// Find the chat row for a given group, if one has been created locally
/// (spec §4.4: "dedup by group_id").
pub fn get_by_group_id(conn: &Connection, group_id: &GroupId) -> Result<Option<Chat>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_type, name, peer_id, created_by, status, group_id, group_creator,
                group_status, key_version, offline_bucket_secret, offline_last_read_ts,
                offline_last_ack_sent, trusted_out_of_band, muted, participants_json
         FROM chats WHERE group_id = ?1",
    )?;
    let mut rows = stmt.query_map([group_id.as_bytes().as_slice()], row_to_chat)?;
    match rows.next() {
        Some(row) => Ok(Some(row??)),
        None => Ok(None),
    }
}

/// Find the direct chat with a given peer, if one exists — used to route
/// group control messages through the pair's direct offline bucket (spec
/// §4.4: "sending through the pair's direct offline bucket (C4)").
pub fn get_by_peer_id(conn: &Connection, peer_id: &PeerId) -> Result<Option<Chat>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_type, name, peer_id, created_by, status, group_id, group_creator,
                group_status, key_version, offline_bucket_secret, offline_last_read_ts,
                offline_last_ack_sent, trusted_out_of_band, muted, participants_json
         FROM chats WHERE chat_type = 'direct' AND peer_id = ?1",
    )?;
    let mut rows = stmt.query_map([peer_id.as_slice()], row_to_chat)?;
    match rows.next() {
        Some(row) => Ok(Some(row??)),
        None => Ok(None),
    }
}

pub fn update_group_status(conn: &Connection, id: &ChatId, status: GroupStatus) -> Result<()> {
    conn.execute(
        "UPDATE chats SET group_status = ?1 WHERE id = ?2",
        params![group_status_str(status), id.as_bytes().as_slice()],
    )?;
    Ok(())
}

/// Apply a key rotation: bump `key_version` and replace the participant set
/// (spec §4.4 "Key rotation", invariant I1).
pub fn apply_key_rotation(
    conn: &Connection,
    id: &ChatId,
    key_version: u64,
    participants: &[PeerId],
) -> Result<()> {
    let json =
        serde_json::to_string(participants).map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "UPDATE chats SET key_version = ?1, participants_json = ?2 WHERE id = ?3",
        params![key_version as i64, json, id.as_bytes().as_slice()],
    )?;
    Ok(())
}

pub fn update_offline_cursor(
    conn: &Connection,
    id: &ChatId,
    last_read_ts: u64,
    last_ack_sent: u64,
) -> Result<()> {
    conn.execute(
        "UPDATE chats SET offline_last_read_ts = ?1, offline_last_ack_sent = ?2 WHERE id = ?3",
        params![last_read_ts as i64, last_ack_sent as i64, id.as_bytes().as_slice()],
    )?;
    Ok(())
}

pub fn list_active(conn: &Connection) -> Result<Vec<Chat>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_type, name, peer_id, created_by, status, group_id, group_creator,
                group_status, key_version, offline_bucket_secret, offline_last_read_ts,
                offline_last_ack_sent, trusted_out_of_band, muted, participants_json
         FROM chats WHERE status = 'active' OR group_status = 'active'",
    )?;
    let rows = stmt
        .query_map([], row_to_chat)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

fn chat_type_str(t: ChatType) -> &'static str {
    match t {
        ChatType::Direct => "direct",
        ChatType::Group => "group",
    }
}

fn chat_status_str(s: ChatStatus) -> &'static str {
    match s {
        ChatStatus::Active => "active",
        ChatStatus::Pending => "pending",
    }
}

fn group_status_str(s: GroupStatus) -> &'static str {
    match s {
        GroupStatus::InvitedPending => "invited_pending",
        GroupStatus::AwaitingActivation => "awaiting_activation",
        GroupStatus::Active => "active",
        GroupStatus::InviteExpired => "invite_expired",
    }
}

fn parse_group_status(s: &str) -> Result<GroupStatus> {
    Ok(match s {
        "invited_pending" => GroupStatus::InvitedPending,
        "awaiting_activation" => GroupStatus::AwaitingActivation,
        "active" => GroupStatus::Active,
        "invite_expired" => GroupStatus::InviteExpired,
        other => return Err(DbError::Serialization(format!("unknown group_status {other}"))),
    })
}

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Chat>> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let chat_type: String = row.get(1)?;
    let peer_id: Option<Vec<u8>> = row.get(3)?;
    let created_by: Vec<u8> = row.get(4)?;
    let status: String = row.get(5)?;
    let group_id: Option<Vec<u8>> = row.get(6)?;
    let group_creator: Option<Vec<u8>> = row.get(7)?;
    let group_status: Option<String> = row.get(8)?;
    let offline_bucket_secret: Option<Vec<u8>> = row.get(10)?;
    let participants_json: String = row.get(15)?;

    Ok((|| -> Result<Chat> {
        Ok(Chat {
            id: uuid::Uuid::from_slice(&id_bytes)
                .map_err(|e| DbError::Serialization(e.to_string()))?,
            chat_type: match chat_type.as_str() {
                "direct" => ChatType::Direct,
                "group" => ChatType::Group,
                other => return Err(DbError::Serialization(format!("unknown chat_type {other}"))),
            },
            name: row.get(2)?,
            peer_id: peer_id
                .map(|p| p.try_into().map_err(|_| DbError::Serialization("peer_id".into())))
                .transpose()?,
            created_by: created_by
                .try_into()
                .map_err(|_| DbError::Serialization("created_by".into()))?,
            status: match status.as_str() {
                "active" => ChatStatus::Active,
                "pending" => ChatStatus::Pending,
                other => return Err(DbError::Serialization(format!("unknown status {other}"))),
            },
            group_id: group_id
                .map(|g| uuid::Uuid::from_slice(&g).map_err(|e| DbError::Serialization(e.to_string())))
                .transpose()?,
            group_creator: group_creator
                .map(|p| p.try_into().map_err(|_| DbError::Serialization("group_creator".into())))
                .transpose()?,
            group_status: group_status.map(|s| parse_group_status(&s)).transpose()?,
            key_version: row.get::<_, i64>(9)? as u64,
            offline_bucket_secret: offline_bucket_secret
                .map(|s| s.try_into().map_err(|_| DbError::Serialization("bucket_secret".into())))
                .transpose()?,
            offline_last_read_ts: row.get::<_, i64>(11)? as u64,
            offline_last_ack_sent: row.get::<_, i64>(12)? as u64,
            trusted_out_of_band: row.get::<_, i64>(13)? != 0,
            muted: row.get::<_, i64>(14)? != 0,
            participants: serde_json::from_str(&participants_json)
                .map_err(|e| DbError::Serialization(e.to_string()))?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_direct_chat() -> Chat {
        Chat {
            id: uuid::Uuid::new_v4(),
            chat_type: ChatType::Direct,
            name: "bob".to_string(),
            peer_id: Some([9u8; 32]),
            created_by: [1u8; 32],
            status: ChatStatus::Active,
            group_id: None,
            group_creator: None,
            group_status: None,
            key_version: 0,
            offline_bucket_secret: Some([2u8; 32]),
            offline_last_read_ts: 0,
            offline_last_ack_sent: 0,
            trusted_out_of_band: false,
            muted: false,
            participants: vec![],
        }
    }

    #[test]
    fn test_insert_and_get_direct_chat() {
        let conn = crate::open_memory().expect("open");
        let chat = sample_direct_chat();
        insert(&conn, &chat).expect("insert");
        let loaded = get(&conn, &chat.id).expect("get");
        assert_eq!(loaded.name, "bob");
        assert_eq!(loaded.offline_bucket_secret, Some([2u8; 32]));
    }

    #[test]
    fn test_apply_key_rotation_bumps_version_and_participants() {
        let conn = crate::open_memory().expect("open");
        let mut chat = sample_direct_chat();
        chat.chat_type = ChatType::Group;
        chat.group_id = Some(uuid::Uuid::new_v4());
        chat.group_status = Some(GroupStatus::Active);
        insert(&conn, &chat).expect("insert");

        apply_key_rotation(&conn, &chat.id, 2, &[[1u8; 32], [2u8; 32]]).expect("rotate");
        let loaded = get(&conn, &chat.id).expect("get");
        assert_eq!(loaded.key_version, 2);
        assert_eq!(loaded.participants, vec![[1u8; 32], [2u8; 32]]);
    }

    #[test]
    fn test_get_by_group_id_dedup_lookup() {
        let conn = crate::open_memory().expect("open");
        let mut chat = sample_direct_chat();
        chat.chat_type = ChatType::Group;
        let gid = uuid::Uuid::new_v4();
        chat.group_id = Some(gid);
        chat.group_status = Some(GroupStatus::InvitedPending);
        insert(&conn, &chat).expect("insert");

        assert!(get_by_group_id(&conn, &gid).expect("lookup").is_some());
        assert!(get_by_group_id(&conn, &uuid::Uuid::new_v4())
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn test_get_by_peer_id_finds_direct_chat_only() {
        let conn = crate::open_memory().expect("open");
        let chat = sample_direct_chat();
        insert(&conn, &chat).expect("insert");

        let found = get_by_peer_id(&conn, &chat.peer_id.unwrap()).expect("lookup").expect("present");
        assert_eq!(found.id, chat.id);
        assert!(get_by_peer_id(&conn, &[0xffu8; 32]).expect("lookup").is_none());
    }
}
