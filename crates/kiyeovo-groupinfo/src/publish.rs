//! DHT-PUT both group-info records (spec §4.6). Unlike the offline-bucket
//! stores, neither record is gzip-compressed — both validators decode the
//! raw JSON directly.

use kiyeovo_dht::keys::{group_info_latest_key, group_info_versioned_key};
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::groupinfo::{GroupInfoLatest, GroupInfoVersioned};

use crate::GroupInfoError;

/// Publish a versioned record followed by the updated latest pointer.
/// Either put failing to reach a peer fails the whole operation — a latest
/// pointer must never outrun a versioned record a reader cannot fetch.
pub async fn publish(
    dht: &dyn DhtClient,
    creator_sign_pub: &[u8; 32],
    versioned: &GroupInfoVersioned,
    latest: &GroupInfoLatest,
) -> Result<(), GroupInfoError> {
    let versioned_key =
        group_info_versioned_key(versioned.group_id, creator_sign_pub, versioned.version);
    let versioned_json = serde_json::to_vec(versioned)?;
    let events = dht.put(versioned_key.as_bytes(), &versioned_json).await;
    require_peer_response(&events)?;

    let latest_key = group_info_latest_key(latest.group_id, creator_sign_pub);
    let latest_json = serde_json::to_vec(latest)?;
    let events = dht.put(latest_key.as_bytes(), &latest_json).await;
    require_peer_response(&events)?;

    Ok(())
}

fn require_peer_response(events: &[DhtEvent]) -> Result<(), GroupInfoError> {
    if events.iter().any(|e| matches!(e, DhtEvent::PeerResponse { .. })) {
        Ok(())
    } else {
        Err(GroupInfoError::NoPeerResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct CountingDht {
        peers: usize,
        puts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl DhtClient for CountingDht {
        async fn get(&self, _key: &[u8]) -> Vec<DhtEvent> {
            vec![DhtEvent::Done]
        }
        async fn put(&self, key: &[u8], _value: &[u8]) -> Vec<DhtEvent> {
            self.puts
                .lock()
                .await
                .push(String::from_utf8_lossy(key).into_owned());
            let mut events: Vec<DhtEvent> = (0..self.peers)
                .map(|i| DhtEvent::PeerResponse { peer_id: format!("p{i}") })
                .collect();
            events.push(DhtEvent::Done);
            events
        }
    }

    fn sample_records() -> (GroupInfoVersioned, GroupInfoLatest) {
        let group_id = uuid::Uuid::new_v4();
        let versioned = GroupInfoVersioned {
            group_id,
            version: 1,
            prev_version_hash: [0u8; 32],
            members: vec![],
            member_signing_pub_keys: Default::default(),
            activated_at: 1000,
            sender_seq_boundaries: Default::default(),
            state_hash: [9u8; 32],
            creator_signature: [0u8; 64],
        };
        let latest = GroupInfoLatest {
            group_id,
            latest_version: 1,
            latest_state_hash: [9u8; 32],
            last_updated: 1000,
            creator_signature: [0u8; 64],
        };
        (versioned, latest)
    }

    #[tokio::test]
    async fn test_publish_puts_both_records() {
        let dht = CountingDht { peers: 1, puts: Mutex::new(vec![]) };
        let (versioned, latest) = sample_records();
        let creator_sign_pub = [1u8; 32];
        publish(&dht, &creator_sign_pub, &versioned, &latest).await.expect("publish");
        let puts = dht.puts.lock().await;
        assert_eq!(puts.len(), 2);
        assert!(puts[0].starts_with("/kiyeovo-group-info-v/"));
        assert!(puts[1].starts_with("/kiyeovo-group-info-latest/"));
    }

    #[tokio::test]
    async fn test_publish_fails_without_peer_response() {
        let dht = CountingDht { peers: 0, puts: Mutex::new(vec![]) };
        let (versioned, latest) = sample_records();
        let creator_sign_pub = [1u8; 32];
        let err = publish(&dht, &creator_sign_pub, &versioned, &latest).await.unwrap_err();
        assert!(matches!(err, GroupInfoError::NoPeerResponse));
    }
}
