//! Read path for both group-info namespaces (spec §4.6, §4.7): DHT-get,
//! keep only replicas that pass the namespace's [`Validator`], then apply
//! the namespace's own consistency rule before trusting a value.

use kiyeovo_dht::keys::{group_info_latest_key, group_info_versioned_key};
use kiyeovo_dht::selectors::{latest_version_is_consistent, select_best, versioned_replicas_identical};
use kiyeovo_dht::validators::{GroupInfoLatestValidator, GroupInfoVersionedValidator, Validator};
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::groupinfo::{GroupInfoLatest, GroupInfoVersioned};
use kiyeovo_types::GroupId;

use crate::GroupInfoError;

/// Fetch and select the best `group-info-latest` replica, or `None` if the
/// group has never published one.
pub async fn fetch_latest(
    dht: &dyn DhtClient,
    group_id: GroupId,
    creator_sign_pub: &[u8; 32],
) -> Result<Option<GroupInfoLatest>, GroupInfoError> {
    let key_path = group_info_latest_key(group_id, creator_sign_pub);
    let validator = GroupInfoLatestValidator;

    let mut candidates = Vec::new();
    for event in dht.get(key_path.as_bytes()).await {
        let DhtEvent::Value(raw) = event else { continue };
        if validator.validate(&key_path, &raw).is_err() {
            tracing::debug!(key_path = %key_path, "dropping group-info-latest replica that failed validation");
            continue;
        }
        if let Ok(record) = serde_json::from_slice::<GroupInfoLatest>(&raw) {
            candidates.push(record);
        }
    }

    if !latest_version_is_consistent(&candidates) {
        return Err(GroupInfoError::LatestReplicasDisagree);
    }

    Ok(select_best(&candidates).cloned())
}

/// Fetch a specific immutable `group-info-v` record.
pub async fn fetch_versioned(
    dht: &dyn DhtClient,
    group_id: GroupId,
    creator_sign_pub: &[u8; 32],
    version: u64,
) -> Result<Option<GroupInfoVersioned>, GroupInfoError> {
    let key_path = group_info_versioned_key(group_id, creator_sign_pub, version);
    let validator = GroupInfoVersionedValidator;

    let mut raw_replicas = Vec::new();
    let mut parsed = None;
    for event in dht.get(key_path.as_bytes()).await {
        let DhtEvent::Value(raw) = event else { continue };
        if validator.validate(&key_path, &raw).is_err() {
            tracing::debug!(key_path = %key_path, "dropping group-info-v replica that failed validation");
            continue;
        }
        if parsed.is_none() {
            parsed = serde_json::from_slice::<GroupInfoVersioned>(&raw).ok();
        }
        raw_replicas.push(raw);
    }

    if !versioned_replicas_identical(&raw_replicas) {
        return Err(GroupInfoError::VersionedReplicasDisagree);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiyeovo_crypto::ed25519::KeyPair;
    use kiyeovo_dht::signing::{group_info_latest_signed_bytes, group_info_versioned_signed_bytes};

    struct FixedDht {
        values: Vec<Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl DhtClient for FixedDht {
        async fn get(&self, _key: &[u8]) -> Vec<DhtEvent> {
            self.values.iter().cloned().map(DhtEvent::Value).collect()
        }
        async fn put(&self, _key: &[u8], _value: &[u8]) -> Vec<DhtEvent> {
            vec![DhtEvent::Done]
        }
    }

    #[tokio::test]
    async fn test_fetch_latest_returns_validated_record() {
        let kp = KeyPair::generate();
        let creator_sign_pub = kp.verifying_key.to_bytes();
        let group_id = uuid::Uuid::new_v4();

        let mut record = GroupInfoLatest {
            group_id,
            latest_version: 3,
            latest_state_hash: [1u8; 32],
            last_updated: 500,
            creator_signature: [0u8; 64],
        };
        let signed = group_info_latest_signed_bytes(&record);
        record.creator_signature = kp.signing_key.sign(&signed).to_bytes();

        let dht = FixedDht { values: vec![serde_json::to_vec(&record).unwrap()] };
        let fetched = fetch_latest(&dht, group_id, &creator_sign_pub).await.expect("fetch").expect("present");
        assert_eq!(fetched.latest_version, 3);
    }

    #[tokio::test]
    async fn test_fetch_latest_none_when_empty() {
        let kp = KeyPair::generate();
        let creator_sign_pub = kp.verifying_key.to_bytes();
        let dht = FixedDht { values: vec![] };
        let fetched = fetch_latest(&dht, uuid::Uuid::new_v4(), &creator_sign_pub).await.expect("fetch");
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_fetch_versioned_returns_validated_record() {
        let kp = KeyPair::generate();
        let creator_sign_pub = kp.verifying_key.to_bytes();
        let group_id = uuid::Uuid::new_v4();

        let mut record = GroupInfoVersioned {
            group_id,
            version: 2,
            prev_version_hash: [0u8; 32],
            members: vec![],
            member_signing_pub_keys: Default::default(),
            activated_at: 100,
            sender_seq_boundaries: Default::default(),
            state_hash: [2u8; 32],
            creator_signature: [0u8; 64],
        };
        let signed = group_info_versioned_signed_bytes(&record);
        record.creator_signature = kp.signing_key.sign(&signed).to_bytes();

        let raw = serde_json::to_vec(&record).unwrap();
        let dht = FixedDht { values: vec![raw.clone(), raw] };
        let fetched = fetch_versioned(&dht, group_id, &creator_sign_pub, 2)
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(fetched.version, 2);
    }
}
