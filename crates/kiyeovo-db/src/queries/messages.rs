//! Message queries (spec §3). `id` is the dedup key.

use rusqlite::{params, Connection};

use kiyeovo_types::message::{Message, MessageType};
use kiyeovo_types::{ChatId, MessageId};

use crate::{DbError, Result};

/// Insert a message. Returns `Ok(false)` without erroring if a message with
/// the same `id` already exists (dedup, spec §3: "Dedup key = id").
pub fn insert_if_new(conn: &Connection, msg: &Message) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO messages (id, chat_id, sender_peer_id, content, message_type, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            msg.id.as_bytes().as_slice(),
            msg.chat_id.as_bytes().as_slice(),
            msg.sender_peer_id.as_slice(),
            msg.content,
            message_type_str(msg.message_type),
            msg.timestamp as i64,
        ],
    )?;
    Ok(changed > 0)
}

pub fn exists(conn: &Connection, id: &MessageId) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE id = ?1",
        [id.as_bytes().as_slice()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_for_chat(conn: &Connection, chat_id: &ChatId) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_id, sender_peer_id, content, message_type, timestamp
         FROM messages WHERE chat_id = ?1 ORDER BY timestamp",
    )?;
    let rows = stmt
        .query_map([chat_id.as_bytes().as_slice()], row_to_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

fn message_type_str(t: MessageType) -> &'static str {
    match t {
        MessageType::Text => "text",
        MessageType::File => "file",
        MessageType::Image => "image",
        MessageType::System => "system",
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Message>> {
    let id: Vec<u8> = row.get(0)?;
    let chat_id: Vec<u8> = row.get(1)?;
    let sender_peer_id: Vec<u8> = row.get(2)?;
    let message_type: String = row.get(4)?;
    Ok((|| -> Result<Message> {
        Ok(Message {
            id: uuid::Uuid::from_slice(&id).map_err(|e| DbError::Serialization(e.to_string()))?,
            chat_id: uuid::Uuid::from_slice(&chat_id)
                .map_err(|e| DbError::Serialization(e.to_string()))?,
            sender_peer_id: sender_peer_id
                .try_into()
                .map_err(|_| DbError::Serialization("sender_peer_id".into()))?,
            content: row.get(3)?,
            message_type: match message_type.as_str() {
                "text" => MessageType::Text,
                "file" => MessageType::File,
                "image" => MessageType::Image,
                "system" => MessageType::System,
                other => {
                    return Err(DbError::Serialization(format!("unknown message_type {other}")))
                }
            },
            timestamp: row.get::<_, i64>(5)? as u64,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(id: uuid::Uuid, chat_id: uuid::Uuid) -> Message {
        Message {
            id,
            chat_id,
            sender_peer_id: [1u8; 32],
            content: "hello".to_string(),
            message_type: MessageType::Text,
            timestamp: 1000,
        }
    }

    #[test]
    fn test_insert_if_new_dedups_by_id() {
        let conn = crate::open_memory().expect("open");
        let chat = kiyeovo_types::chat::Chat {
            id: uuid::Uuid::new_v4(),
            chat_type: kiyeovo_types::chat::ChatType::Direct,
            name: "c".into(),
            peer_id: Some([0u8; 32]),
            created_by: [0u8; 32],
            status: kiyeovo_types::chat::ChatStatus::Active,
            group_id: None,
            group_creator: None,
            group_status: None,
            key_version: 0,
            offline_bucket_secret: None,
            offline_last_read_ts: 0,
            offline_last_ack_sent: 0,
            trusted_out_of_band: false,
            muted: false,
            participants: vec![],
        };
        super::super::chats::insert(&conn, &chat).expect("insert chat");

        let msg_id = uuid::Uuid::new_v4();
        let msg = sample_message(msg_id, chat.id);
        assert!(insert_if_new(&conn, &msg).expect("first insert"));
        assert!(!insert_if_new(&conn, &msg).expect("duplicate insert is no-op"));
        assert_eq!(list_for_chat(&conn, &chat.id).expect("list").len(), 1);
    }
}
