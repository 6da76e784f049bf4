//! The direct offline bucket put algorithm (spec §4.3 "Put algorithm"):
//! read the local mirror, drop TTL-expired messages, refuse at the store
//! cap, append, bump version, sign, gzip, DHT-PUT, and require at least one
//! `PEER_RESPONSE` event.

use kiyeovo_crypto::blake3;
use kiyeovo_dht::compression;
use kiyeovo_dht::signing::{offline_message_signed_bytes, offline_store_signed_bytes};
use kiyeovo_identity::sign;
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::offline_direct::{
    OfflineMessage, OfflineMessageSignedPayload, OfflineStore, OfflineStoreSignedPayload,
};
use kiyeovo_types::MessageId;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::config::OfflineConfig;
use crate::mirror::BucketMirror;
use crate::seal;
use crate::OfflineError;

/// What a sender RSA-seals alongside the message content, so the recipient
/// can learn who sent it and piggyback an offline-read acknowledgement
/// (spec §4.3, §4.3 "ACK piggybacking").
#[derive(Serialize, Deserialize)]
pub struct SenderInfo {
    pub peer_id: kiyeovo_types::PeerId,
    pub username: String,
    pub offline_ack_timestamp: Option<u64>,
}

/// Append `plaintext` to our outgoing bucket at `bucket_key` and publish it.
///
/// `peer_rsa_pub` is the recipient's offline RSA public key (from their
/// [`kiyeovo_types::contact::User`] row); the message content and sender
/// info are both sealed under it.
#[allow(clippy::too_many_arguments)]
pub async fn put(
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    config: &OfflineConfig,
    bucket_key: &str,
    identity: &Identity,
    peer_rsa_pub: &RsaPublicKey,
    sender_info: &SenderInfo,
    message_id: MessageId,
    plaintext: &[u8],
    expires_at: u64,
    now: u64,
) -> Result<(), OfflineError> {
    let mut store = mirror
        .get(bucket_key)
        .cloned()
        .unwrap_or_else(|| OfflineStore::empty(bucket_key, now));
    store.retain_unexpired(now);

    if store.messages.len() >= config.max_messages_per_store {
        return Err(OfflineError::StoreFull {
            len: store.messages.len(),
            cap: config.max_messages_per_store,
        });
    }

    let sealed_content = seal::seal_content(peer_rsa_pub, plaintext)?;

    let sender_info_json =
        serde_json::to_vec(sender_info).map_err(OfflineError::Json)?;
    let encrypted_sender_info = kiyeovo_crypto::rsa::oaep_encrypt(peer_rsa_pub, &sender_info_json)?;

    let signed_payload = OfflineMessageSignedPayload {
        content_hash: blake3::hash(&sealed_content.content),
        sender_info_hash: blake3::hash(&encrypted_sender_info),
        timestamp: now,
        bucket_key: bucket_key.to_string(),
    };
    let signed_bytes = offline_message_signed_bytes(&signed_payload);
    let signature = sign(identity, &signed_bytes).to_bytes();

    let message = OfflineMessage {
        id: message_id,
        encrypted_sender_info,
        content: sealed_content.content,
        message_type: sealed_content.message_type,
        encrypted_aes_key: sealed_content.encrypted_aes_key,
        aes_iv: sealed_content.aes_iv,
        signature,
        signed_payload,
        timestamp: now,
        expires_at,
    };
    store.messages.push(message);

    publish(mirror, dht, bucket_key, identity, store, now).await
}

/// Drop every message with `timestamp <= up_to_ts` from our outgoing
/// bucket and republish (spec §4.3 "ACK piggybacking":
/// `clearAcknowledgedMessages`). A no-op if nothing is dropped.
pub async fn clear_acknowledged_messages(
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    bucket_key: &str,
    identity: &Identity,
    up_to_ts: u64,
    now: u64,
) -> Result<(), OfflineError> {
    let Some(mut store) = mirror.get(bucket_key).cloned() else {
        return Ok(());
    };
    let before = store.messages.len();
    store.messages.retain(|m| m.timestamp > up_to_ts);
    if store.messages.len() == before {
        return Ok(());
    }
    publish(mirror, dht, bucket_key, identity, store, now).await
}

/// Bump `version`, sign, compress, and DHT-PUT a store, committing it to
/// the mirror only once at least one peer acknowledged the write.
async fn publish(
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    bucket_key: &str,
    identity: &Identity,
    mut store: OfflineStore,
    now: u64,
) -> Result<(), OfflineError> {
    store.version += 1;
    store.last_updated = now;

    let store_signed_payload = OfflineStoreSignedPayload {
        message_ids: store.messages.iter().map(|m| m.id).collect(),
        version: store.version,
        timestamp: now,
        bucket_key: bucket_key.to_string(),
    };
    let store_signed_bytes = offline_store_signed_bytes(&store_signed_payload);
    store.store_signature = sign(identity, &store_signed_bytes).to_bytes();
    store.store_signed_payload = store_signed_payload;

    let json = serde_json::to_vec(&store).map_err(OfflineError::Json)?;
    let compressed = compression::compress(&json)?;

    let events = dht.put(bucket_key.as_bytes(), &compressed).await;
    let acknowledged = events.iter().any(|e| matches!(e, DhtEvent::PeerResponse { .. }));
    if !acknowledged {
        return Err(OfflineError::NoPeerResponse);
    }

    mirror.put(bucket_key.to_string(), store);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiyeovo_crypto::ed25519::KeyPair;
    use kiyeovo_crypto::rsa::RsaKeyPair;
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn identity_for(kp: &KeyPair) -> Identity {
        Identity {
            id: kiyeovo_crypto::ed25519::derive_peer_id(&kp.verifying_key),
            libp2p_priv: kp.signing_key.to_bytes(),
            sign_priv: kp.signing_key.to_bytes(),
            sign_pub: kp.verifying_key.to_bytes(),
            offline_rsa_priv: vec![],
            offline_rsa_pub: vec![],
            notif_rsa_priv: vec![],
            notif_rsa_pub: vec![],
        }
    }

    struct CountingDht {
        peers: usize,
        puts: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl DhtClient for CountingDht {
        async fn get(&self, _key: &[u8]) -> Vec<DhtEvent> {
            vec![DhtEvent::Done]
        }
        async fn put(&self, _key: &[u8], value: &[u8]) -> Vec<DhtEvent> {
            self.puts.lock().await.push(value.to_vec());
            let mut events: Vec<DhtEvent> = (0..self.peers)
                .map(|i| DhtEvent::PeerResponse { peer_id: format!("p{i}") })
                .collect();
            events.push(DhtEvent::Done);
            events
        }
    }

    #[tokio::test]
    async fn test_put_requires_peer_response() {
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let rsa = RsaKeyPair::generate().expect("rsa keygen");
        let dht = CountingDht { peers: 0, puts: Mutex::new(vec![]) };
        let mut mirror = BucketMirror::new(Duration::from_secs(60));
        let config = OfflineConfig::default();
        let sender_info = SenderInfo {
            peer_id: identity.id,
            username: "alice".to_string(),
            offline_ack_timestamp: None,
        };

        let err = put(
            &mut mirror,
            &dht,
            &config,
            "/kiyeovo-offline/a/b",
            &identity,
            &rsa.public_key,
            &sender_info,
            uuid::Uuid::new_v4(),
            b"hello",
            2000,
            1000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OfflineError::NoPeerResponse));
        assert!(mirror.is_empty());
    }

    #[tokio::test]
    async fn test_put_appends_and_bumps_version() {
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let rsa = RsaKeyPair::generate().expect("rsa keygen");
        let dht = CountingDht { peers: 1, puts: Mutex::new(vec![]) };
        let mut mirror = BucketMirror::new(Duration::from_secs(60));
        let config = OfflineConfig::default();
        let sender_info = SenderInfo {
            peer_id: identity.id,
            username: "alice".to_string(),
            offline_ack_timestamp: None,
        };

        put(
            &mut mirror,
            &dht,
            &config,
            "/kiyeovo-offline/a/b",
            &identity,
            &rsa.public_key,
            &sender_info,
            uuid::Uuid::new_v4(),
            b"hello",
            2000,
            1000,
        )
        .await
        .expect("put");

        let store = mirror.get("/kiyeovo-offline/a/b").expect("mirrored");
        assert_eq!(store.version, 1);
        assert_eq!(store.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_at_cap() {
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let rsa = RsaKeyPair::generate().expect("rsa keygen");
        let dht = CountingDht { peers: 1, puts: Mutex::new(vec![]) };
        let mut mirror = BucketMirror::new(Duration::from_secs(60));
        let config = OfflineConfig { max_messages_per_store: 1, ..OfflineConfig::default() };
        let sender_info = SenderInfo {
            peer_id: identity.id,
            username: "alice".to_string(),
            offline_ack_timestamp: None,
        };

        put(
            &mut mirror, &dht, &config, "/b", &identity, &rsa.public_key, &sender_info,
            uuid::Uuid::new_v4(), b"one", 2000, 1000,
        )
        .await
        .expect("first put");

        let err = put(
            &mut mirror, &dht, &config, "/b", &identity, &rsa.public_key, &sender_info,
            uuid::Uuid::new_v4(), b"two", 2000, 1000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OfflineError::StoreFull { .. }));
    }
}
