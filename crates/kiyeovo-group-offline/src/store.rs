//! The group offline bucket put algorithm (spec §4.5 "Put algorithm"):
//! read the authoritative store (local cache, falling back to a DHT read on
//! a cold cache), drop TTL-expired messages, refuse a duplicate
//! `messageId`, append, trim the oldest entry once the per-sender cap is
//! hit, bump `version`, DHT-PUT, and retry once with a union-merge if the
//! remote store had advanced past ours.

use kiyeovo_dht::compression;
use kiyeovo_dht::selectors::{select_best, VersionedRecord};
use kiyeovo_dht::validators::{GroupOfflineValidator, Validator};
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::offline_group::GroupOfflineStore;
use kiyeovo_types::{GroupId, MessageId};

use crate::cache::BucketCache;
use crate::config::GroupOfflineConfig;
use crate::crypt::build_signed_message;
use crate::GroupOfflineError;

/// Append `plaintext` to our own `(group_id, key_version)` bucket and
/// publish it, returning the `seq` assigned to the new message.
///
/// A `messageId` already present in the bucket is treated as already
/// delivered: the put is a no-op and the existing `seq` is returned.
#[allow(clippy::too_many_arguments)]
pub async fn put(
    cache: &mut BucketCache,
    dht: &dyn DhtClient,
    config: &GroupOfflineConfig,
    identity: &Identity,
    group_id: GroupId,
    key_version: u64,
    epoch_key: &[u8; 32],
    message_id: MessageId,
    message_type: kiyeovo_types::message::MessageType,
    plaintext: &[u8],
    now: u64,
) -> Result<u64, GroupOfflineError> {
    let bucket_key = kiyeovo_dht::keys::group_offline_key(group_id, key_version, &identity.sign_pub);

    let mut store = read_authoritative(cache, dht, &bucket_key).await?;
    store.messages.retain(|m| now.saturating_sub(m.timestamp) <= config.message_ttl_ms);

    if let Some(existing) = store.messages.iter().find(|m| m.message_id == message_id) {
        return Ok(existing.seq);
    }

    let seq = store.highest_seq + 1;
    let message = build_signed_message(
        identity, group_id, key_version, message_id, message_type, epoch_key, seq, plaintext, now,
    )?;
    store.messages.push(message);
    trim_to_cap(&mut store, config.max_messages_per_sender);
    store.recompute_highest_seq();
    store.version += 1;
    store.last_updated = now;

    match publish(dht, config, &bucket_key, &store).await {
        Ok(()) => {
            cache.put(bucket_key, store);
            Ok(seq)
        }
        Err(GroupOfflineError::NoPeerResponse) => {
            tracing::debug!(%bucket_key, "group offline put rejected, merging and retrying once");
            let mut remote = fetch_best(dht, &bucket_key).await?.unwrap_or_else(GroupOfflineStore::empty);
            merge_messages(&mut remote, &store.messages);
            trim_to_cap(&mut remote, config.max_messages_per_sender);
            remote.recompute_highest_seq();
            remote.version = remote.version.max(store.version) + 1;
            remote.last_updated = now;

            publish(dht, config, &bucket_key, &remote).await?;
            cache.put(bucket_key, remote);
            Ok(seq)
        }
        Err(other) => Err(other),
    }
}

/// The store a put should build on top of: the local cache if warm,
/// otherwise whatever the DHT currently holds, otherwise empty.
async fn read_authoritative(
    cache: &BucketCache,
    dht: &dyn DhtClient,
    bucket_key: &str,
) -> Result<GroupOfflineStore, GroupOfflineError> {
    if let Some(store) = cache.get(bucket_key) {
        return Ok(store.clone());
    }
    Ok(fetch_best(dht, bucket_key).await?.unwrap_or_else(GroupOfflineStore::empty))
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

/// Union two message sets by `message_id`, keeping `base`'s copy on
/// conflict (both sides signed the same plaintext under the same `seq`, so
/// the choice is arbitrary), then order the result by `seq`.
fn merge_messages(base: &mut GroupOfflineStore, theirs: &[kiyeovo_types::offline_group::GroupContentMessage]) {
    for message in theirs {
        if !base.messages.iter().any(|m| m.message_id == message.message_id) {
            base.messages.push(message.clone());
        }
    }
    base.messages.sort_by_key(|m| m.seq);
}

fn trim_to_cap(store: &mut GroupOfflineStore, cap: usize) {
    if store.messages.len() <= cap {
        return;
    }
    store.messages.sort_by_key(|m| m.seq);
    let excess = store.messages.len() - cap;
    store.messages.drain(0..excess);
}

async fn publish(
    dht: &dyn DhtClient,
    config: &GroupOfflineConfig,
    bucket_key: &str,
    store: &GroupOfflineStore,
) -> Result<(), GroupOfflineError> {
    let json = serde_json::to_vec(store)?;
    let compressed = compression::compress(&json)?;
    if compressed.len() > config.store_max_compressed_bytes {
        return Err(GroupOfflineError::StoreTooLarge {
            size: compressed.len(),
            cap: config.store_max_compressed_bytes,
        });
    }

    let events = dht.put(bucket_key.as_bytes(), &compressed).await;
    let acknowledged = events.iter().any(|e| matches!(e, DhtEvent::PeerResponse { .. }));
    if !acknowledged {
        return Err(GroupOfflineError::NoPeerResponse);
    }
    Ok(())
}
