//! Direct offline bucket sweep: poll every active direct chat's peer
//! bucket, persist new messages, route control-plane JSON into
//! `kiyeovo-group::dispatch`, and piggyback ACK clearing on our own
//! outgoing bucket (spec §4.3 "ACK piggybacking", §4.4).

use rusqlite::Connection;

use kiyeovo_db::queries::{chats, contacts};
use kiyeovo_group::config::GroupConfig;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::chat::ChatType;
use kiyeovo_types::control::GroupControlMessage;
use kiyeovo_types::identity::Identity;

use crate::events::SchedulerEvents;
use crate::SchedulerError;

/// Poll every active direct chat's offline bucket once.
///
/// Failures are isolated per chat: one peer's malformed bucket or an
/// unreachable DHT never stops the sweep from reaching the rest (spec §7
/// "background loops never panic on a single item").
#[allow(clippy::too_many_arguments)]
pub async fn sweep_direct_offline(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    events: &dyn SchedulerEvents,
    now: u64,
) {
    let rsa_priv = match kiyeovo_identity::decode_rsa_private(&identity.offline_rsa_priv) {
        Ok(key) => key,
        Err(err) => {
            tracing::error!(%err, "cannot decode our own offline RSA key, skipping direct offline sweep");
            return;
        }
    };

    let active = match chats::list_active(conn) {
        Ok(chats) => chats,
        Err(err) => {
            tracing::warn!(%err, "failed to list active chats for direct offline sweep");
            return;
        }
    };

    for chat in active {
        if chat.chat_type != ChatType::Direct {
            continue;
        }
        let (Some(peer_id), Some(bucket_secret)) = (chat.peer_id, chat.offline_bucket_secret) else {
            continue;
        };

        if let Err(err) = sweep_one_chat(
            conn, mirror, dht, offline_config, group_config, identity, own_username, events,
            chat.id, peer_id, &bucket_secret, &rsa_priv, now,
        )
        .await
        {
            tracing::warn!(chat_id = %chat.id, %err, "direct offline sweep failed for this chat, continuing");
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn sweep_one_chat(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    events: &dyn SchedulerEvents,
    chat_id: kiyeovo_types::ChatId,
    peer_id: kiyeovo_types::PeerId,
    bucket_secret: &[u8; 32],
    rsa_priv: &rsa::RsaPrivateKey,
    now: u64,
) -> Result<(), SchedulerError> {
    let contact = contacts::get(conn, &peer_id)?;
    let read_key = kiyeovo_offline::read_key_path(bucket_secret, &identity.sign_pub, &contact.sign_pub);

    let outcome = kiyeovo_offline::poll_bucket(dht, &read_key, rsa_priv, conn, chat_id, now).await?;

    for message in &outcome.received {
        match serde_json::from_str::<GroupControlMessage>(&message.content) {
            Ok(control_message) => {
                match kiyeovo_group::dispatch(
                    conn, mirror, dht, offline_config, group_config, identity, own_username,
                    message.sender_peer_id, &control_message, now,
                )
                .await
                {
                    Ok(event) => events.on_control_dispatched(&event),
                    Err(err) => tracing::warn!(chat_id = %chat_id, %err, "failed to dispatch inbound control message"),
                }
            }
            Err(_) => events.on_message_received(message),
        }
    }

    if let Some(ack_ts) = outcome.peer_ack_timestamp {
        let write_key = kiyeovo_offline::write_key_path(bucket_secret, &identity.sign_pub, &contact.sign_pub);
        kiyeovo_offline::clear_acknowledged_messages(mirror, dht, &write_key, identity, ack_ts, now).await?;
        let chat = chats::get(conn, &chat_id)?;
        chats::update_offline_cursor(conn, &chat_id, chat.offline_last_read_ts, ack_ts)?;
    }

    Ok(())
}
