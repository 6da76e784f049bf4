//! The group offline bucket receive path (spec §4.5 "Receive algorithm"):
//! for every non-retired epoch, fetch each roster member's bucket, verify
//! and decrypt new messages in `(seq, timestamp)` order, flag any gap in
//! `seq` as non-fatal, and advance the per-`(group, epoch, sender)` cursor.

use rusqlite::Connection;

use kiyeovo_db::queries::{group_key_history, group_offline, messages as message_queries};
use kiyeovo_dht::compression;
use kiyeovo_dht::keys::group_offline_key;
use kiyeovo_dht::selectors::select_best;
use kiyeovo_dht::validators::{GroupOfflineValidator, Validator};
use kiyeovo_groupinfo::fetch_versioned;
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::message::{Message, MessageType};
use kiyeovo_types::offline_group::{GapWarning, GroupOfflineStore};
use kiyeovo_types::{ChatId, GroupId, PeerId};

use crate::crypt::verify_and_decrypt;
use crate::GroupOfflineError;

/// The messages newly persisted by a poll across every roster member and
/// non-retired epoch, plus any gaps observed in a sender's `seq` sequence.
pub struct PollOutcome {
    pub received: Vec<Message>,
    pub gap_warnings: Vec<GapWarning>,
}

/// Poll every epoch up to `current_key_version` for a group chat.
///
/// `self_peer_id` is excluded from the roster fetch (we never poll our own
/// bucket). `creator_sign_pub` identifies the group-info records to read.
#[allow(clippy::too_many_arguments)]
pub async fn poll_group(
    dht: &dyn DhtClient,
    conn: &Connection,
    chat_id: ChatId,
    group_id: GroupId,
    creator_sign_pub: &[u8; 32],
    self_peer_id: &PeerId,
    current_key_version: u64,
    message_ttl_ms: u64,
    grace_window_ms: u64,
    now: u64,
) -> Result<PollOutcome, GroupOfflineError> {
    let mut outcome = PollOutcome { received: Vec::new(), gap_warnings: Vec::new() };

    for epoch in group_key_history::list_up_to(conn, &group_id, current_key_version)? {
        let Some(roster_record) = fetch_versioned(dht, group_id, creator_sign_pub, epoch.key_version).await? else {
            tracing::debug!(key_version = epoch.key_version, "no group-info-v record for this epoch yet, skipping");
            continue;
        };
        let boundary_record = fetch_versioned(dht, group_id, creator_sign_pub, epoch.key_version + 1).await?;

        for member in &roster_record.members {
            if &member.peer_id == self_peer_id {
                continue;
            }
            poll_member_epoch(
                dht, conn, chat_id, group_id, &epoch, &member.peer_id, &member.signing_pub,
                boundary_record.as_ref().and_then(|r| r.boundary_for(&member.peer_id)),
                message_ttl_ms, grace_window_ms, now, &mut outcome,
            )
            .await?;
        }
    }

    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
async fn poll_member_epoch(
    dht: &dyn DhtClient,
    conn: &Connection,
    chat_id: ChatId,
    group_id: GroupId,
    epoch: &kiyeovo_types::group::GroupKeyHistoryEntry,
    sender_peer_id: &PeerId,
    sender_signing_pub: &[u8; 32],
    boundary: Option<u64>,
    message_ttl_ms: u64,
    grace_window_ms: u64,
    now: u64,
    outcome: &mut PollOutcome,
) -> Result<(), GroupOfflineError> {
    let bucket_key = group_offline_key(group_id, epoch.key_version, sender_signing_pub);
    let Some(store) = fetch_best(dht, &bucket_key).await? else {
        return Ok(());
    };

    let mut messages = store.messages;
    messages.sort_by_key(|m| (m.seq, m.timestamp));

    let mut highest_seen = group_offline::get_member_seq(conn, &group_id, epoch.key_version, sender_peer_id)?;
    let mut cursor_ts = group_offline::get_cursor(conn, &group_id, epoch.key_version, sender_peer_id)?
        .map(|(ts, _)| ts)
        .unwrap_or(0);

    for message in &messages {
        if now.saturating_sub(message.timestamp) > message_ttl_ms {
            continue;
        }
        if let Some(used_until) = epoch.used_until {
            if message.timestamp > used_until + grace_window_ms {
                continue;
            }
        }
        if let Some(boundary) = boundary {
            if message.seq > boundary {
                continue;
            }
        }

        let plaintext = match verify_and_decrypt(message, sender_signing_pub, &epoch.key) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                tracing::debug!(%bucket_key, seq = message.seq, "dropping group content message with invalid signature");
                continue;
            }
        };

        if message.seq <= highest_seen {
            cursor_ts = cursor_ts.max(message.timestamp);
            continue;
        }
        if message.seq > highest_seen + 1 {
            outcome.gap_warnings.push(GapWarning {
                chat_id,
                group_id,
                key_version: epoch.key_version,
                sender_peer_id: *sender_peer_id,
                expected: highest_seen + 1,
                actual: message.seq,
            });
        }
        highest_seen = message.seq;
        cursor_ts = cursor_ts.max(message.timestamp);

        let content = String::from_utf8_lossy(&plaintext).into_owned();
        let persisted = Message {
            id: message.message_id,
            chat_id,
            sender_peer_id: *sender_peer_id,
            content,
            message_type: message.message_type,
            timestamp: message.timestamp,
        };
        if message_queries::insert_if_new(conn, &persisted)? {
            outcome.received.push(persisted);
        }
    }

    group_offline::update_member_seq(conn, &group_id, epoch.key_version, sender_peer_id, highest_seen)?;
    group_offline::upsert_cursor(conn, &group_id, epoch.key_version, sender_peer_id, cursor_ts, None)?;
    Ok(())
}

async fn fetch_best(dht: &dyn DhtClient, bucket_key: &str) -> Result<Option<GroupOfflineStore>, GroupOfflineError> {
    let validator = GroupOfflineValidator;
    let mut candidates: Vec<GroupOfflineStore> = Vec::new();
    for event in dht.get(bucket_key.as_bytes()).await {
        let DhtEvent::Value(raw) = event else { continue };
        if validator.validate(bucket_key, &raw).is_err() {
            tracing::debug!(%bucket_key, "dropping group offline replica that failed validation");
            continue;
        }
        let json = match compression::decompress(&raw) {
            Ok(j) => j,
            Err(_) => continue,
        };
        if let Ok(store) = serde_json::from_slice::<GroupOfflineStore>(&json) {
            candidates.push(store);
        }
    }
    Ok(select_best(&candidates).cloned())
}
