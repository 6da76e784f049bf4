//! Group creation (spec §4.4 "Lifecycle"): pick a group id, create the
//! local chat row, and fan invites out to every invitee in small batches.
//!
//! The creator's own chat does not become `active` here — there is no
//! epoch key yet, since one only exists once the first invitee accepts
//! (see [`crate::creator::handle_invite_response`]). Until then the chat
//! sits in `invited_pending` just like the invitees' own copies.

use rusqlite::Connection;
use uuid::Uuid;

use kiyeovo_db::queries::{chats, pending_acks};
use kiyeovo_identity::sign;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::chat::{Chat, ChatStatus, ChatType, GroupStatus};
use kiyeovo_types::control::{GroupControlMessage, GroupInvite};
use kiyeovo_types::group::PendingAckMessageType;
use kiyeovo_types::identity::Identity;
use kiyeovo_types::{ChatId, PeerId};

use crate::config::GroupConfig;
use crate::send::send_control_message;
use crate::signing::invite_signed_bytes;
use crate::GroupError;

/// Create a group with `invitees` as the initial invite list, persist the
/// local chat row, and send each invite through its recipient's direct
/// offline bucket, signed and tracked in Pending ACK.
#[allow(clippy::too_many_arguments)]
pub async fn create_group(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    group_name: &str,
    invitees: &[PeerId],
    now: u64,
) -> Result<ChatId, GroupError> {
    if invitees.len() < 2 {
        return Err(GroupError::TooFewMembers);
    }
    if invitees.len() + 1 > config.max_members {
        return Err(GroupError::TooManyMembers);
    }

    let group_id = Uuid::new_v4();
    let chat_id = Uuid::new_v4();

    let chat = Chat {
        id: chat_id,
        chat_type: ChatType::Group,
        name: group_name.to_string(),
        peer_id: None,
        created_by: identity.id,
        status: ChatStatus::Active,
        group_id: Some(group_id),
        group_creator: Some(identity.id),
        group_status: Some(GroupStatus::InvitedPending),
        key_version: 0,
        offline_bucket_secret: None,
        offline_last_read_ts: 0,
        offline_last_ack_sent: 0,
        trusted_out_of_band: false,
        muted: false,
        participants: vec![identity.id],
    };
    chats::insert(conn, &chat)?;

    for batch in invitees.chunks(config.invite_batch_size.max(1)) {
        for &target_peer_id in batch {
            let invite_id = Uuid::new_v4().to_string();
            let expires_at = now + config.invite_lifetime_ms;

            let mut invite = GroupInvite {
                group_id,
                invite_id: invite_id.clone(),
                group_name: group_name.to_string(),
                expires_at,
                creator_signature: [0u8; 64],
            };
            invite.creator_signature = sign(identity, &invite_signed_bytes(&invite)).to_bytes();

            let message = GroupControlMessage::Invite(invite);
            pending_acks::upsert(
                conn,
                &kiyeovo_types::group::PendingAck {
                    group_id,
                    target_peer_id,
                    message_type: PendingAckMessageType::GroupInvite,
                    message_id: invite_id,
                    payload_json: serde_json::to_string(&message)?,
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
                target_peer_id,
                &message,
                expires_at,
                now,
            )
            .await?;
        }
    }

    Ok(chat_id)
}
