//! Group offline bucket sweep: poll every active group chat's per-epoch
//! sender buckets, persist new messages and surface gap warnings, then
//! periodically retire epochs that every roster member has caught up on
//! (spec §4.5).

use rusqlite::Connection;

use kiyeovo_db::queries::{chats, contacts};
use kiyeovo_group_offline::{BucketCache, GroupOfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::chat::ChatType;
use kiyeovo_types::identity::Identity;
use kiyeovo_types::PeerId;

use crate::events::SchedulerEvents;
use crate::SchedulerError;

/// Poll every active group chat's offline buckets once.
///
/// Failures are isolated per chat, matching the direct offline sweep.
pub async fn sweep_group_offline(
    conn: &Connection,
    dht: &dyn DhtClient,
    group_offline_config: &GroupOfflineConfig,
    identity: &Identity,
    events: &dyn SchedulerEvents,
    now: u64,
) {
    let active = match chats::list_active(conn) {
        Ok(chats) => chats,
        Err(err) => {
            tracing::warn!(%err, "failed to list active chats for group offline sweep");
            return;
        }
    };

    for chat in active {
        if chat.chat_type != ChatType::Group {
            continue;
        }
        let Some(group_id) = chat.group_id else { continue };

        let creator_sign_pub = match resolve_creator_sign_pub(conn, identity, &chat) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(chat_id = %chat.id, %err, "cannot resolve group creator signing key, skipping");
                continue;
            }
        };

        match kiyeovo_group_offline::poll_group(
            dht,
            conn,
            chat.id,
            group_id,
            &creator_sign_pub,
            &identity.id,
            chat.key_version,
            group_offline_config.message_ttl_ms,
            group_offline_config.rotation_grace_window_ms,
            now,
        )
        .await
        {
            Ok(outcome) => {
                for message in &outcome.received {
                    events.on_message_received(message);
                }
                for warning in &outcome.gap_warnings {
                    events.on_gap_warning(warning);
                }
            }
            Err(err) => tracing::warn!(chat_id = %chat.id, %err, "group offline poll failed, continuing"),
        }
    }
}

/// Retire epochs eligible for cleanup on every active group chat once.
///
/// Run on a slower cadence than [`sweep_group_offline`] (spec §4.5: driven
/// by `GROUP_OFFLINE_CLEANUP_INTERVAL_MS`, an order of magnitude coarser
/// than the poll interval).
pub async fn sweep_group_retirement(
    conn: &Connection,
    dht: &dyn DhtClient,
    cache: &mut BucketCache,
    group_offline_config: &GroupOfflineConfig,
    identity: &Identity,
    now: u64,
) {
    let active = match chats::list_active(conn) {
        Ok(chats) => chats,
        Err(err) => {
            tracing::warn!(%err, "failed to list active chats for group retirement sweep");
            return;
        }
    };

    for chat in active {
        if chat.chat_type != ChatType::Group {
            continue;
        }
        let Some(group_id) = chat.group_id else { continue };

        let creator_sign_pub = match resolve_creator_sign_pub(conn, identity, &chat) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(chat_id = %chat.id, %err, "cannot resolve group creator signing key, skipping");
                continue;
            }
        };

        match kiyeovo_group_offline::retire_eligible_epochs(
            dht,
            conn,
            cache,
            group_id,
            &creator_sign_pub,
            &chat.participants,
            chat.key_version,
            group_offline_config.rotation_grace_window_ms,
            now,
        )
        .await
        {
            Ok(retired) if !retired.is_empty() => {
                tracing::info!(chat_id = %chat.id, ?retired, "retired group offline epochs");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(chat_id = %chat.id, %err, "group epoch retirement failed, continuing"),
        }
    }
}

/// The creator's signing key identifies which group-info records belong
/// to this group (spec §4.4 Glossary: records are keyed by creator
/// signing key, not group id, to prevent a non-creator from squatting the
/// namespace). We are either the creator ourselves, or a contact.
fn resolve_creator_sign_pub(
    conn: &Connection,
    identity: &Identity,
    chat: &kiyeovo_types::chat::Chat,
) -> Result<[u8; 32], SchedulerError> {
    let creator: PeerId = chat
        .group_creator
        .ok_or_else(|| SchedulerError::Group(kiyeovo_group::GroupError::GroupInfoMissing))?;

    if creator == identity.id {
        return Ok(identity.sign_pub);
    }

    let contact = contacts::get(conn, &creator)?;
    Ok(contact.sign_pub)
}
