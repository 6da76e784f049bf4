//! The `Message` entity (spec §3).

use serde::{Deserialize, Serialize};

use crate::{ChatId, MessageId, PeerId};

/// Message content kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    File,
    Image,
    System,
}

/// A persisted message row. `id` is the dedup key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_peer_id: PeerId,
    pub content: String,
    pub message_type: MessageType,
    pub timestamp: u64,
}
