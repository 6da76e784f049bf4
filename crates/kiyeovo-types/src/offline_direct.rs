//! The direct offline bucket wire format (spec §4.3).
//!
//! A store is the value published at
//! `/kiyeovo-offline/{bucket_secret}/{sender_sign_pub_b64url}`: a signed,
//! size-bounded list of RSA-sealed messages. The signature covers only
//! hashes of the encrypted blobs plus the timestamp and bucket key, so a
//! validator can verify write authorisation without decrypting (spec §4.3
//! "Signature contract").

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::MessageId;

/// How `OfflineMessage::content` (and `encrypted_sender_info`) was sealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineMessageType {
    /// Plaintext fit within the RSA-OAEP modulus; content is RSA-encrypted
    /// directly.
    Encrypted,
    /// Plaintext exceeded the RSA bound; content is AES-256-GCM-encrypted
    /// under a random key, and that key is RSA-wrapped.
    Hybrid,
    /// Used only for sender-info placeholder paths that never carry secret
    /// material; direct message content is never `Plain`.
    Plain,
}

/// The payload a sender signs: hashes of the ciphertexts plus the full
/// bucket key, so tampering with either blob or re-homing the message to a
/// different bucket breaks the signature (spec §4.3).
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineMessageSignedPayload {
    #[serde_as(as = "serde_with::Bytes")]
    pub content_hash: [u8; 32],
    #[serde_as(as = "serde_with::Bytes")]
    pub sender_info_hash: [u8; 32],
    pub timestamp: u64,
    pub bucket_key: String,
}

/// One sealed message in a direct offline store.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineMessage {
    pub id: MessageId,
    /// RSA-OAEP-sealed `{peer_id, username, offline_ack_timestamp?}`.
    pub encrypted_sender_info: Vec<u8>,
    /// RSA-OAEP-sealed (or hybrid-sealed) message content.
    pub content: Vec<u8>,
    pub message_type: OfflineMessageType,
    /// Hybrid-only: the AES-256-GCM key, RSA-wrapped.
    pub encrypted_aes_key: Option<Vec<u8>>,
    /// Hybrid-only: the 12-byte AES-GCM nonce.
    pub aes_iv: Option<[u8; 12]>,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
    pub signed_payload: OfflineMessageSignedPayload,
    pub timestamp: u64,
    pub expires_at: u64,
}

impl OfflineMessage {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// The payload the sender signs to authorise the whole store (spec §4.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineStoreSignedPayload {
    pub message_ids: Vec<MessageId>,
    pub version: u64,
    pub timestamp: u64,
    pub bucket_key: String,
}

/// The value published at a direct offline bucket key.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineStore {
    pub messages: Vec<OfflineMessage>,
    /// Strictly increasing per write (invariant I5).
    pub version: u64,
    pub last_updated: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub store_signature: [u8; 64],
    pub store_signed_payload: OfflineStoreSignedPayload,
}

impl OfflineStore {
    /// A fresh, empty store for a bucket that has never been written to.
    pub fn empty(bucket_key: impl Into<String>, now: u64) -> Self {
        OfflineStore {
            messages: Vec::new(),
            version: 0,
            last_updated: now,
            store_signature: [0u8; 64],
            store_signed_payload: OfflineStoreSignedPayload {
                message_ids: Vec::new(),
                version: 0,
                timestamp: now,
                bucket_key: bucket_key.into(),
            },
        }
    }

    /// Drop messages whose `expires_at` has passed (spec §4.3 "Put
    /// algorithm": "drop TTL-expired messages").
    pub fn retain_unexpired(&mut self, now: u64) {
        self.messages.retain(|m| !m.is_expired(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_has_version_zero() {
        let store = OfflineStore::empty("/kiyeovo-offline/abc/def", 1000);
        assert_eq!(store.version, 0);
        assert!(store.messages.is_empty());
    }

    #[test]
    fn test_retain_unexpired_drops_stale_messages() {
        let mut store = OfflineStore::empty("/k", 1000);
        store.messages.push(OfflineMessage {
            id: uuid::Uuid::new_v4(),
            encrypted_sender_info: vec![],
            content: vec![],
            message_type: OfflineMessageType::Encrypted,
            encrypted_aes_key: None,
            aes_iv: None,
            signature: [0u8; 64],
            signed_payload: OfflineMessageSignedPayload {
                content_hash: [0u8; 32],
                sender_info_hash: [0u8; 32],
                timestamp: 900,
                bucket_key: "/k".to_string(),
            },
            timestamp: 900,
            expires_at: 950,
        });
        store.retain_unexpired(1000);
        assert!(store.messages.is_empty());
    }
}
