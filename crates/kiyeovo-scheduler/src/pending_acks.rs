//! Pending ACK re-publish sweep: anything we sent and have not yet seen
//! acknowledged gets republished to its target's offline bucket so an
//! offline peer that missed the first publish (bucket TTL, mirror
//! restart) eventually sees it too (spec §3, §4.4).

use rusqlite::Connection;

use kiyeovo_db::queries::pending_acks;
use kiyeovo_group::config::GroupConfig;
use kiyeovo_group::send::send_control_message;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::control::GroupControlMessage;
use kiyeovo_types::identity::Identity;

use crate::SchedulerError;

/// Re-publish every outstanding pending ACK once.
///
/// Failures are isolated per row: a single malformed payload or an
/// unreachable DHT never stops the sweep from reaching the rest.
#[allow(clippy::too_many_arguments)]
pub async fn sweep_pending_acks(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    now: u64,
) {
    let rows = match pending_acks::list_all(conn) {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(%err, "failed to list pending acks for re-publish sweep");
            return;
        }
    };

    for row in rows {
        if let Err(err) = republish_one(
            conn, mirror, dht, offline_config, group_config, identity, own_username, &row, now,
        )
        .await
        {
            tracing::warn!(
                group_id = %row.group_id,
                target = ?row.target_peer_id,
                %err,
                "failed to re-publish pending ack, continuing"
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn republish_one(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    offline_config: &OfflineConfig,
    group_config: &GroupConfig,
    identity: &Identity,
    own_username: &str,
    row: &kiyeovo_types::group::PendingAck,
    now: u64,
) -> Result<(), SchedulerError> {
    let message: GroupControlMessage = serde_json::from_str(&row.payload_json)?;
    let expires_at = now + group_config.ack_ttl_ms;

    send_control_message(
        conn,
        mirror,
        dht,
        offline_config,
        identity,
        own_username,
        row.target_peer_id,
        &message,
        expires_at,
        now,
    )
    .await?;

    Ok(())
}
