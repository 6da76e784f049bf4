//! Control-ACK matching (spec §4.4 "Control-ACK matching"): every
//! acknowledgement names the message it acks by id. A pending row is
//! removed only when the id matches what we actually sent — a mismatch
//! (a stale ack for a message we've since superseded) is a silent drop,
//! not an error.

use rusqlite::Connection;

use kiyeovo_db::queries::pending_acks;
use kiyeovo_types::control::{AckedMessageType, GroupControlAck, GroupInviteDeliveredAck, GroupInviteResponseAck};
use kiyeovo_types::group::PendingAckMessageType;
use kiyeovo_types::PeerId;

use crate::GroupError;

/// Ack for a `GROUP_WELCOME` or `GROUP_STATE_UPDATE`.
pub fn handle_control_ack(conn: &Connection, sender_peer_id: PeerId, ack: &GroupControlAck) -> Result<(), GroupError> {
    let message_type = match ack.acked_message_type {
        AckedMessageType::GroupWelcome => PendingAckMessageType::GroupWelcome,
        AckedMessageType::GroupStateUpdate => PendingAckMessageType::GroupStateUpdate,
    };
    if let Some(pending) = pending_acks::get(conn, &ack.group_id, &sender_peer_id, message_type)? {
        if pending.message_id == ack.acked_message_id {
            pending_acks::remove(conn, &ack.group_id, &sender_peer_id, message_type)?;
        }
    }
    Ok(())
}

/// Ack for a `GROUP_INVITE_RESPONSE`.
pub fn handle_invite_response_ack(
    conn: &Connection,
    sender_peer_id: PeerId,
    ack: &GroupInviteResponseAck,
) -> Result<(), GroupError> {
    let message_type = PendingAckMessageType::GroupInviteResponse;
    if let Some(pending) = pending_acks::get(conn, &ack.group_id, &sender_peer_id, message_type)? {
        if pending.message_id == ack.acked_message_id {
            pending_acks::remove(conn, &ack.group_id, &sender_peer_id, message_type)?;
        }
    }
    Ok(())
}

/// Ack for a `GROUP_INVITE` (spec §4.4: "Respond ... with
/// GROUP_INVITE_DELIVERED_ACK").
pub fn handle_invite_delivered_ack(
    conn: &Connection,
    sender_peer_id: PeerId,
    ack: &GroupInviteDeliveredAck,
) -> Result<(), GroupError> {
    let message_type = PendingAckMessageType::GroupInvite;
    if let Some(pending) = pending_acks::get(conn, &ack.group_id, &sender_peer_id, message_type)? {
        if pending.message_id == ack.invite_id {
            pending_acks::remove(conn, &ack.group_id, &sender_peer_id, message_type)?;
        }
    }
    Ok(())
}
