//! The direct offline bucket receive path: DHT-get a peer's store, keep
//! only replicas that pass the same write-authorisation check a remote
//! replica would run, pick the best one, unseal each message, and persist
//! new ones (spec §4.3, §4.7).

use kiyeovo_dht::compression;
use kiyeovo_dht::selectors::select_best;
use kiyeovo_dht::validators::{DirectOfflineValidator, Validator};
use kiyeovo_db::queries::{chats, messages as message_queries};
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::message::{Message, MessageType};
use kiyeovo_types::offline_direct::OfflineStore;
use kiyeovo_types::ChatId;
use rsa::RsaPrivateKey;
use rusqlite::Connection;

use crate::seal::unseal_content;
use crate::store::SenderInfo;
use crate::OfflineError;

/// The messages newly persisted by a poll, plus the highest
/// `offline_ack_timestamp` any of them carried (the caller uses this to
/// decide whether to run `clear_acknowledged_messages` on its own
/// outgoing bucket).
pub struct PollOutcome {
    pub received: Vec<Message>,
    pub peer_ack_timestamp: Option<u64>,
}

/// Poll one peer's outgoing bucket and persist any messages we have not
/// already seen (deduplicated by `OfflineMessage::id`, spec §4.3).
pub async fn poll_bucket(
    dht: &dyn DhtClient,
    key_path: &str,
    rsa_priv: &RsaPrivateKey,
    conn: &Connection,
    chat_id: ChatId,
    now: u64,
) -> Result<PollOutcome, OfflineError> {
    let events = dht.get(key_path.as_bytes()).await;
    let validator = DirectOfflineValidator;

    let mut candidates: Vec<OfflineStore> = Vec::new();
    for event in events {
        let DhtEvent::Value(raw) = event else { continue };
        if validator.validate(key_path, &raw).is_err() {
            tracing::debug!(key_path, "dropping offline replica that failed validation");
            continue;
        }
        let json = match compression::decompress(&raw) {
            Ok(j) => j,
            Err(_) => continue,
        };
        if let Ok(store) = serde_json::from_slice::<OfflineStore>(&json) {
            candidates.push(store);
        }
    }

    let Some(store) = select_best(&candidates) else {
        return Ok(PollOutcome { received: vec![], peer_ack_timestamp: None });
    };

    let chat = chats::get(conn, &chat_id)?;
    let mut last_read_ts = chat.offline_last_read_ts;
    let mut received = Vec::new();
    let mut peer_ack_timestamp = None;

    for offline_message in &store.messages {
        if offline_message.is_expired(now) {
            continue;
        }

        let sender_info_json = kiyeovo_crypto::rsa::oaep_decrypt(rsa_priv, &offline_message.encrypted_sender_info)?;
        let sender_info: SenderInfo = serde_json::from_slice(&sender_info_json).map_err(OfflineError::Json)?;

        let plaintext = unseal_content(
            rsa_priv,
            offline_message.message_type,
            &offline_message.content,
            offline_message.encrypted_aes_key.as_deref(),
            offline_message.aes_iv.as_ref(),
        )?;
        let content = String::from_utf8_lossy(&plaintext).into_owned();

        let message = Message {
            id: offline_message.id,
            chat_id,
            sender_peer_id: sender_info.peer_id,
            content,
            message_type: MessageType::Text,
            timestamp: offline_message.timestamp,
        };

        if message_queries::insert_if_new(conn, &message)? {
            received.push(message);
        }
        last_read_ts = last_read_ts.max(offline_message.timestamp);

        if let Some(ack_ts) = sender_info.offline_ack_timestamp {
            peer_ack_timestamp = Some(peer_ack_timestamp.unwrap_or(0).max(ack_ts));
        }
    }

    chats::update_offline_cursor(conn, &chat_id, last_read_ts, chat.offline_last_ack_sent)?;

    Ok(PollOutcome { received, peer_ack_timestamp })
}
