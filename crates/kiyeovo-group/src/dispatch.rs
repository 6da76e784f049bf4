//! Routes an inbound `GroupControlMessage` to the handler that owns its
//! variant. This is the single entry point `kiyeovo-scheduler` calls once
//! it has unsealed a message from a direct offline bucket and found it to
//! be a control message rather than ordinary chat content.

use rusqlite::Connection;

use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::control::GroupControlMessage;
use kiyeovo_types::identity::Identity;
use kiyeovo_types::{GroupId, PeerId};

use crate::config::GroupConfig;
use crate::{ack, creator, invitee, joiner};
use crate::GroupError;

/// What happened as a result of dispatching one control message, for the
/// caller to surface to the UI or the scheduler's own bookkeeping.
#[derive(Debug, Clone)]
pub enum GroupEvent {
    InviteReceived { group_id: GroupId },
    InviteAnswered { group_id: GroupId, peer_id: PeerId, accepted: bool },
    GroupActivated { group_id: GroupId },
    ControlAcknowledged { group_id: GroupId },
}

/// Dispatch one inbound control message from `sender_peer_id`.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    sender_peer_id: PeerId,
    message: &GroupControlMessage,
    now: u64,
) -> Result<GroupEvent, GroupError> {
    match message {
        GroupControlMessage::Invite(invite) => {
            let group_id = invite.group_id;
            invitee::handle_invite(
                conn, mirror, dht, offline_config, identity, own_username, sender_peer_id, invite, now,
            )
            .await?;
            Ok(GroupEvent::InviteReceived { group_id })
        }
        GroupControlMessage::InviteResponse(response) => {
            let group_id = response.group_id;
            let accepted = response.accept;
            creator::handle_invite_response(
                conn, mirror, dht, offline_config, group_config, identity, own_username, sender_peer_id, response, now,
            )
            .await?;
            Ok(GroupEvent::InviteAnswered { group_id, peer_id: sender_peer_id, accepted })
        }
        GroupControlMessage::Welcome(welcome) => {
            let group_id = welcome.group_id;
            joiner::handle_welcome(
                conn, mirror, dht, offline_config, group_config, identity, own_username, sender_peer_id, welcome, now,
            )
            .await?;
            Ok(GroupEvent::GroupActivated { group_id })
        }
        GroupControlMessage::StateUpdate(update) => {
            let group_id = update.group_id;
            joiner::handle_state_update(
                conn, mirror, dht, offline_config, group_config, identity, own_username, sender_peer_id, update, now,
            )
            .await?;
            Ok(GroupEvent::GroupActivated { group_id })
        }
        GroupControlMessage::ControlAck(control_ack) => {
            let group_id = control_ack.group_id;
            ack::handle_control_ack(conn, sender_peer_id, control_ack)?;
            Ok(GroupEvent::ControlAcknowledged { group_id })
        }
        GroupControlMessage::InviteResponseAck(response_ack) => {
            let group_id = response_ack.group_id;
            ack::handle_invite_response_ack(conn, sender_peer_id, response_ack)?;
            Ok(GroupEvent::ControlAcknowledged { group_id })
        }
        GroupControlMessage::InviteDeliveredAck(delivered_ack) => {
            let group_id = delivered_ack.group_id;
            ack::handle_invite_delivered_ack(conn, sender_peer_id, delivered_ack)?;
            Ok(GroupEvent::ControlAcknowledged { group_id })
        }
    }
}
