//! Invitee path (spec §4.4 "Invitee path"): handle an inbound
//! `GROUP_INVITE`, and later carry the user's own accept/reject decision
//! back to the creator.

use rusqlite::Connection;
use uuid::Uuid;

use kiyeovo_db::queries::{chats, contacts, pending_acks};
use kiyeovo_identity::sign;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::chat::{Chat, ChatStatus, ChatType, GroupStatus};
use kiyeovo_types::control::{GroupControlMessage, GroupInvite, GroupInviteDeliveredAck, GroupInviteResponse};
use kiyeovo_types::group::{PendingAck, PendingAckMessageType};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::{GroupId, PeerId};

use crate::config::GroupConfig;
use crate::send::send_control_message;
use crate::signing::{invite_response_signed_bytes, invite_signed_bytes};
use crate::GroupError;

/// Handle a freshly-received `GROUP_INVITE`. Unknown or blocked senders
/// are dropped silently; a duplicate for a group we already have a chat
/// row for only triggers a delivery ack, never a second chat row (spec
/// §4.4: "dedup by group_id").
#[allow(clippy::too_many_arguments)]
pub async fn handle_invite(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    identity: &Identity,
    own_username: &str,
    creator_peer_id: PeerId,
    invite: &GroupInvite,
    now: u64,
) -> Result<(), GroupError> {
    let Ok(creator_contact) = contacts::get(conn, &creator_peer_id) else {
        tracing::debug!(?creator_peer_id, "dropping group invite from unknown peer");
        return Ok(());
    };
    if creator_contact.blocked {
        return Ok(());
    }

    let signature = kiyeovo_crypto::ed25519::Signature::from_bytes(&invite.creator_signature);
    kiyeovo_identity::verify(&creator_contact.sign_pub, &invite_signed_bytes(invite), &signature)
        .map_err(|_| GroupError::BadSignature)?;

    if now >= invite.expires_at {
        tracing::debug!(group_id = %invite.group_id, "dropping already-lapsed group invite");
        return Ok(());
    }

    if chats::get_by_group_id(conn, &invite.group_id)?.is_some() {
        send_delivered_ack(conn, mirror, dht, offline_config, identity, own_username, creator_peer_id, invite, now)
            .await?;
        return Ok(());
    }

    let chat = Chat {
        id: Uuid::new_v4(),
        chat_type: ChatType::Group,
        name: invite.group_name.clone(),
        peer_id: None,
        created_by: creator_peer_id,
        status: ChatStatus::Active,
        group_id: Some(invite.group_id),
        group_creator: Some(creator_peer_id),
        group_status: Some(GroupStatus::InvitedPending),
        key_version: 0,
        offline_bucket_secret: None,
        offline_last_read_ts: 0,
        offline_last_ack_sent: 0,
        trusted_out_of_band: false,
        muted: false,
        participants: vec![creator_peer_id],
    };
    chats::insert(conn, &chat)?;
    tracing::info!(group_id = %invite.group_id, group_name = %invite.group_name, "received group invite");

    send_delivered_ack(conn, mirror, dht, offline_config, identity, own_username, creator_peer_id, invite, now).await
}

async fn send_delivered_ack(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    identity: &Identity,
    own_username: &str,
    creator_peer_id: PeerId,
    invite: &GroupInvite,
    now: u64,
) -> Result<(), GroupError> {
    let ack = GroupControlMessage::InviteDeliveredAck(GroupInviteDeliveredAck {
        group_id: invite.group_id,
        invite_id: invite.invite_id.clone(),
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
        now + crate::config::GROUP_ACK_MESSAGE_TTL_MS,
        now,
    )
    .await
}

/// Record the user's own answer to an invite and send it to the creator.
/// Accepting moves the chat to `awaiting_activation` (it becomes `active`
/// only once the creator's `GROUP_WELCOME` arrives); rejecting moves it
/// straight to `invite_expired`.
#[allow(clippy::too_many_arguments)]
pub async fn respond_to_invite(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    group_id: GroupId,
    invite_id: &str,
    accept: bool,
    now: u64,
) -> Result<(), GroupError> {
    let chat = chats::get_by_group_id(conn, &group_id)?.ok_or(GroupError::InviteIdMismatch)?;
    let creator_peer_id = chat.group_creator.ok_or(GroupError::InviteIdMismatch)?;

    let mut response = GroupInviteResponse {
        group_id,
        invite_id: invite_id.to_string(),
        accept,
        message_id: Uuid::new_v4().to_string(),
        timestamp: now,
        responder_peer_id: identity.id,
        signature: [0u8; 64],
    };
    response.signature = sign(identity, &invite_response_signed_bytes(&response)).to_bytes();

    let message = GroupControlMessage::InviteResponse(response.clone());
    pending_acks::upsert(
        conn,
        &PendingAck {
            group_id,
            target_peer_id: creator_peer_id,
            message_type: PendingAckMessageType::GroupInviteResponse,
            message_id: response.message_id.clone(),
            payload_json: serde_json::to_string(&message)?,
        },
        now,
    )?;

    chats::update_group_status(
        conn,
        &chat.id,
        if accept { GroupStatus::AwaitingActivation } else { GroupStatus::InviteExpired },
    )?;

    send_control_message(
        conn,
        mirror,
        dht,
        offline_config,
        identity,
        own_username,
        creator_peer_id,
        &message,
        now + config.invite_lifetime_ms,
        now,
    )
    .await
}
