//! Joiner path (spec §4.4 "Joiner path on welcome" and "Key rotation"):
//! receive a new epoch key from the creator, either as a brand-new
//! member's `GROUP_WELCOME` or as an existing member's `GROUP_STATE_UPDATE`.
//!
//! Neither message carries its own signature — authenticity comes from the
//! offline-bucket transport, which only hands us a message after verifying
//! it was written by the bucket owner (the creator). We still check that
//! the sender matches the chat's recorded `group_creator`, since that is a
//! fact our own database can assert independent of the transport.

use rusqlite::Connection;

use kiyeovo_db::queries::{chats, contacts, group_key_history, pending_acks};
use kiyeovo_identity::decode_rsa_private;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::chat::GroupStatus;
use kiyeovo_types::contact::User;
use kiyeovo_types::control::{AckedMessageType, GroupControlAck, GroupControlMessage, GroupStateUpdate, GroupWelcome};
use kiyeovo_types::group::{GroupKeyHistoryEntry, PendingAckMessageType, RosterMember};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::PeerId;

use crate::config::GroupConfig;
use crate::send::send_control_message;
use crate::GroupError;

/// Handle a `GROUP_WELCOME`: decrypt the epoch key, record it, join the
/// group, and ack. A welcome for an epoch we already hold is acked again
/// without re-processing — the creator may retry before our first ack
/// lands.
#[allow(clippy::too_many_arguments)]
pub async fn handle_welcome(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    creator_peer_id: PeerId,
    welcome: &GroupWelcome,
    now: u64,
) -> Result<(), GroupError> {
    let Some(chat) = chats::get_by_group_id(conn, &welcome.group_id)? else {
        return Ok(());
    };
    if chat.group_creator != Some(creator_peer_id) {
        return Err(GroupError::NotCreator);
    }

    if chat.group_status == Some(GroupStatus::Active) && chat.key_version >= welcome.key_version {
        return ack_welcome(
            conn, mirror, dht, offline_config, group_config, identity, own_username, creator_peer_id, welcome, now,
        )
        .await;
    }

    let rsa_priv = decode_rsa_private(&identity.offline_rsa_priv)?;
    let group_key_bytes = kiyeovo_crypto::rsa::oaep_decrypt(&rsa_priv, &welcome.encrypted_group_key)?;
    let group_key: [u8; 32] = group_key_bytes.try_into().map_err(|_| GroupError::MalformedGroupKey)?;

    let creator_contact = contacts::get(conn, &creator_peer_id)?;
    let versioned = kiyeovo_groupinfo::fetch_versioned(dht, welcome.group_id, &creator_contact.sign_pub, welcome.key_version)
        .await?
        .ok_or(GroupError::GroupInfoMissing)?;

    group_key_history::append(
        conn,
        &GroupKeyHistoryEntry {
            group_id: welcome.group_id,
            key_version: welcome.key_version,
            key: group_key,
            state_hash: versioned.state_hash,
            used_until: None,
        },
    )?;

    apply_roster(conn, &chat.id, welcome.group_id, welcome.key_version, &welcome.roster, identity.id, now)?;
    chats::update_group_status(conn, &chat.id, GroupStatus::Active)?;
    pending_acks::remove(conn, &welcome.group_id, &creator_peer_id, PendingAckMessageType::GroupInviteResponse)?;

    ack_welcome(
        conn, mirror, dht, offline_config, group_config, identity, own_username, creator_peer_id, welcome, now,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn ack_welcome(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    creator_peer_id: PeerId,
    welcome: &GroupWelcome,
    now: u64,
) -> Result<(), GroupError> {
    let ack = GroupControlMessage::ControlAck(GroupControlAck {
        group_id: welcome.group_id,
        acked_message_type: AckedMessageType::GroupWelcome,
        acked_message_id: welcome.message_id.clone(),
    });
    send_control_message(
        conn,
        mirror,
        dht,
        offline_config,
        identity,
        own_username,
        creator_peer_id,
        &ack,
        now + group_config.ack_ttl_ms,
        now,
    )
    .await
}

/// Handle a `GROUP_STATE_UPDATE`: an existing member learning the roster's
/// new epoch key after another member joined, left, or was kicked.
#[allow(clippy::too_many_arguments)]
pub async fn handle_state_update(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    creator_peer_id: PeerId,
    update: &GroupStateUpdate,
    now: u64,
) -> Result<(), GroupError> {
    let Some(chat) = chats::get_by_group_id(conn, &update.group_id)? else {
        return Ok(());
    };
    if chat.group_creator != Some(creator_peer_id) {
        return Err(GroupError::NotCreator);
    }

    if chat.key_version < update.key_version {
        let rsa_priv = decode_rsa_private(&identity.offline_rsa_priv)?;
        let group_key_bytes = kiyeovo_crypto::rsa::oaep_decrypt(&rsa_priv, &update.encrypted_group_key)?;
        let group_key: [u8; 32] = group_key_bytes.try_into().map_err(|_| GroupError::MalformedGroupKey)?;

        let creator_contact = contacts::get(conn, &creator_peer_id)?;
        let versioned =
            kiyeovo_groupinfo::fetch_versioned(dht, update.group_id, &creator_contact.sign_pub, update.key_version)
                .await?
                .ok_or(GroupError::GroupInfoMissing)?;

        group_key_history::append(
            conn,
            &GroupKeyHistoryEntry {
                group_id: update.group_id,
                key_version: update.key_version,
                key: group_key,
                state_hash: versioned.state_hash,
                used_until: None,
            },
        )?;
        apply_roster(conn, &chat.id, update.group_id, update.key_version, &update.roster, identity.id, now)?;
    }

    let ack = GroupControlMessage::ControlAck(GroupControlAck {
        group_id: update.group_id,
        acked_message_type: AckedMessageType::GroupStateUpdate,
        acked_message_id: update.message_id.clone(),
    });
    send_control_message(
        conn,
        mirror,
        dht,
        offline_config,
        identity,
        own_username,
        creator_peer_id,
        &ack,
        now + group_config.ack_ttl_ms,
        now,
    )
    .await
}

fn apply_roster(
    conn: &Connection,
    chat_id: &kiyeovo_types::ChatId,
    group_id: kiyeovo_types::GroupId,
    key_version: u64,
    roster: &[RosterMember],
    own_peer_id: PeerId,
    now: u64,
) -> Result<(), GroupError> {
    let roster_peer_ids: Vec<PeerId> = roster.iter().map(|m| m.peer_id).collect();
    chats::apply_key_rotation(conn, chat_id, key_version, &roster_peer_ids)?;

    for member in roster {
        if member.peer_id == own_peer_id {
            continue;
        }
        contacts::upsert(
            conn,
            &User {
                peer_id: member.peer_id,
                username: member.username.clone(),
                sign_pub: member.signing_pub,
                offline_rsa_pub: member.offline_rsa_pub.clone(),
                handshake_sig: None,
                blocked: false,
                added_at: now,
            },
        )?;
    }
    tracing::debug!(%group_id, key_version, "applied new group roster");
    Ok(())
}
