//! Creator's response handling (spec §4.4 "Creator's response handling"):
//! react to a `GROUP_INVITE_RESPONSE`, rotating the epoch key and welcoming
//! the new member (or letting a rejection lapse the outstanding invite).

use rusqlite::Connection;
use uuid::Uuid;

use kiyeovo_db::queries::{chats, contacts, pending_acks};
use kiyeovo_identity::decode_rsa_public;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::chat::GroupStatus;
use kiyeovo_types::control::{
    GroupControlMessage, GroupInviteResponse, GroupInviteResponseAck, GroupStateUpdate, GroupWelcome,
};
use kiyeovo_types::group::{PendingAck, PendingAckMessageType, RosterEvent, RosterMember};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::PeerId;

use crate::config::GroupConfig;
use crate::rotation::rotate_key;
use crate::send::send_control_message;
use crate::signing::invite_response_signed_bytes;
use crate::GroupError;

/// Handle a `GROUP_INVITE_RESPONSE` from `sender_peer_id`. A response with
/// no matching outstanding invite (already answered, or never sent) is
/// dropped idempotently rather than treated as an error.
#[allow(clippy::too_many_arguments)]
pub async fn handle_invite_response(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    sender_peer_id: PeerId,
    response: &GroupInviteResponse,
    now: u64,
) -> Result<(), GroupError> {
    let Some(chat) = chats::get_by_group_id(conn, &response.group_id)? else {
        return Ok(());
    };
    if chat.group_creator != Some(identity.id) {
        return Err(GroupError::NotCreator);
    }

    let Some(pending) = pending_acks::get(
        conn,
        &response.group_id,
        &sender_peer_id,
        PendingAckMessageType::GroupInvite,
    )?
    else {
        return Ok(());
    };
    if pending.message_id != response.invite_id {
        return Err(GroupError::InviteIdMismatch);
    }

    let sender_contact = contacts::get(conn, &sender_peer_id)?;
    let signature = kiyeovo_crypto::ed25519::Signature::from_bytes(&response.signature);
    kiyeovo_identity::verify(&sender_contact.sign_pub, &invite_response_signed_bytes(response), &signature)
        .map_err(|_| GroupError::BadSignature)?;

    let invite: kiyeovo_types::control::GroupInvite = match serde_json::from_str::<GroupControlMessage>(&pending.payload_json)? {
        GroupControlMessage::Invite(invite) => invite,
        _ => return Err(GroupError::InviteIdMismatch),
    };
    if now > invite.expires_at {
        return Err(GroupError::InviteExpired);
    }

    send_control_message(
        conn,
        mirror,
        dht,
        offline_config,
        identity,
        own_username,
        sender_peer_id,
        &GroupControlMessage::InviteResponseAck(GroupInviteResponseAck {
            group_id: response.group_id,
            acked_message_id: response.message_id.clone(),
        }),
        now + group_config.ack_ttl_ms,
        now,
    )
    .await?;

    // A response proves the invite was delivered, so we stop retrying it
    // regardless of the answer.
    pending_acks::remove(conn, &response.group_id, &sender_peer_id, PendingAckMessageType::GroupInvite)?;

    if !response.accept {
        return Ok(());
    }
    if chat.participants.contains(&sender_peer_id) {
        return Ok(());
    }
    if chat.participants.len() + 1 > group_config.max_members {
        return Err(GroupError::TooManyMembers);
    }

    let mut roster = Vec::with_capacity(chat.participants.len() + 1);
    for &peer_id in &chat.participants {
        roster.push(if peer_id == identity.id {
            RosterMember {
                peer_id: identity.id,
                username: own_username.to_string(),
                signing_pub: identity.sign_pub,
                offline_rsa_pub: identity.offline_rsa_pub.clone(),
            }
        } else {
            let member = contacts::get(conn, &peer_id)?;
            RosterMember {
                peer_id: member.peer_id,
                username: member.username,
                signing_pub: member.sign_pub,
                offline_rsa_pub: member.offline_rsa_pub,
            }
        });
    }
    roster.push(RosterMember {
        peer_id: sender_contact.peer_id,
        username: sender_contact.username.clone(),
        signing_pub: sender_contact.sign_pub,
        offline_rsa_pub: sender_contact.offline_rsa_pub.clone(),
    });

    let existing_members: Vec<PeerId> = chat.participants.iter().copied().filter(|&p| p != identity.id).collect();

    let rotated = rotate_key(conn, dht, identity, chat.id, response.group_id, &roster, 0, now).await?;

    let joiner_rsa_pub = decode_rsa_public(&sender_contact.offline_rsa_pub)?;
    let welcome = GroupWelcome {
        group_id: response.group_id,
        group_name: chat.name.clone(),
        key_version: rotated.key_version,
        encrypted_group_key: kiyeovo_crypto::rsa::oaep_encrypt(&joiner_rsa_pub, &rotated.group_key)?,
        roster: roster.clone(),
        group_info_latest_dht_key: kiyeovo_dht::keys::group_info_latest_key(response.group_id, &identity.sign_pub),
        message_id: Uuid::new_v4().to_string(),
    };
    let welcome_message = GroupControlMessage::Welcome(welcome);
    pending_acks::upsert(
        conn,
        &PendingAck {
            group_id: response.group_id,
            target_peer_id: sender_peer_id,
            message_type: PendingAckMessageType::GroupWelcome,
            message_id: message_id_of(&welcome_message),
            payload_json: serde_json::to_string(&welcome_message)?,
        },
        now,
    )?;
    send_control_message(
        conn,
        mirror,
        dht,
        offline_config,
        identity,
        own_username,
        sender_peer_id,
        &welcome_message,
        now + group_config.ack_ttl_ms,
        now,
    )
    .await?;

    for member_peer_id in existing_members {
        let member_contact = contacts::get(conn, &member_peer_id)?;
        let member_rsa_pub = decode_rsa_public(&member_contact.offline_rsa_pub)?;
        let state_update = GroupStateUpdate {
            group_id: response.group_id,
            event: RosterEvent::Join,
            key_version: rotated.key_version,
            encrypted_group_key: kiyeovo_crypto::rsa::oaep_encrypt(&member_rsa_pub, &rotated.group_key)?,
            roster: roster.clone(),
            target_peer_id: member_peer_id,
            message_id: Uuid::new_v4().to_string(),
        };
        let update_message = GroupControlMessage::StateUpdate(state_update);
        pending_acks::upsert(
            conn,
            &PendingAck {
                group_id: response.group_id,
                target_peer_id: member_peer_id,
                message_type: PendingAckMessageType::GroupStateUpdate,
                message_id: message_id_of(&update_message),
                payload_json: serde_json::to_string(&update_message)?,
            },
            now,
        )?;
        send_control_message(
            conn,
            mirror,
            dht,
            offline_config,
            identity,
            own_username,
            member_peer_id,
            &update_message,
            now + group_config.ack_ttl_ms,
            now,
        )
        .await?;
    }

    chats::update_group_status(conn, &chat.id, GroupStatus::Active)?;

    Ok(())
}

fn message_id_of(message: &GroupControlMessage) -> String {
    match message {
        GroupControlMessage::Welcome(w) => w.message_id.clone(),
        GroupControlMessage::StateUpdate(u) => u.message_id.clone(),
        _ => unreachable!("only called for welcome/state-update messages"),
    }
}
