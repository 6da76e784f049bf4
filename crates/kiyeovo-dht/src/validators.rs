//! Per-namespace write-authorisation validators (spec §4.7): every namespace
//! enforces key-path schema parse, a 32-byte Ed25519 public-key segment, a
//! payload-bound signature, and that any `groupId`/`version`/`keyVersion`
//! fields inside the payload match the key path. A validator runs on the
//! remote replica receiving a write and never decrypts anything — only
//! hashes and signatures are checked.

use thiserror::Error;

use kiyeovo_crypto::blake3;
use kiyeovo_crypto::ed25519::{Signature, VerifyingKey};
use kiyeovo_types::groupinfo::{GroupInfoLatest, GroupInfoVersioned};
use kiyeovo_types::offline_direct::OfflineStore;
use kiyeovo_types::offline_group::GroupOfflineStore;

use crate::compression::{self, CompressionError};
use crate::keys::{
    self, parse_direct_offline_key, parse_group_info_latest_key, parse_group_info_versioned_key,
    parse_group_offline_key, KeyPathError,
};
use crate::signing;

#[derive(Debug, Error)]
pub enum DhtError {
    #[error(transparent)]
    KeyPath(#[from] KeyPathError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error("value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),

    #[error("store signature invalid")]
    InvalidStoreSignature,

    #[error("message {0} has an invalid signature")]
    InvalidMessageSignature(usize),

    #[error("embedded field '{0}' does not match the key path")]
    FieldMismatch(&'static str),

    #[error("message {0} content does not match its signed hash")]
    ContentHashMismatch(usize),
}

pub type Result<T> = std::result::Result<T, DhtError>;

/// A per-namespace write-authorisation check.
pub trait Validator: Send + Sync {
    fn validate(&self, key_path: &str, raw_value: &[u8]) -> Result<()>;
}

/// `/kiyeovo-offline/...` — version-monotone, tiebreak `last_updated` (the
/// monotonicity check itself lives in the selector; this validator only
/// checks structural and cryptographic well-formedness of a single write).
pub struct DirectOfflineValidator;

impl Validator for DirectOfflineValidator {
    fn validate(&self, key_path: &str, raw_value: &[u8]) -> Result<()> {
        let parts = parse_direct_offline_key(key_path)?;
        let sender_pub = VerifyingKey::from_bytes(&parts.sender_sign_pub)?;

        let json = compression::decompress(raw_value)?;
        let store: OfflineStore = serde_json::from_slice(&json)?;

        if store.store_signed_payload.bucket_key != key_path {
            return Err(DhtError::FieldMismatch("bucket_key"));
        }
        let store_signed = signing::offline_store_signed_bytes(&store.store_signed_payload);
        sender_pub
            .verify(&store_signed, &Signature::from_bytes(&store.store_signature))
            .map_err(|_| DhtError::InvalidStoreSignature)?;

        for (index, message) in store.messages.iter().enumerate() {
            if message.signed_payload.bucket_key != key_path {
                return Err(DhtError::FieldMismatch("signed_payload.bucket_key"));
            }
            let msg_signed = signing::offline_message_signed_bytes(&message.signed_payload);
            sender_pub
                .verify(&msg_signed, &Signature::from_bytes(&message.signature))
                .map_err(|_| DhtError::InvalidMessageSignature(index))?;

            // The signature only binds the *claimed* hashes, not the blobs
            // themselves, so a bit flipped in `content` or
            // `encrypted_sender_info` after signing would otherwise pass
            // signature verification untouched (spec §8: "flipping any byte
            // breaks exactly one of: message signature, content hash,
            // sender-info hash, bucket binding").
            if blake3::hash(&message.content) != message.signed_payload.content_hash {
                return Err(DhtError::ContentHashMismatch(index));
            }
            if blake3::hash(&message.encrypted_sender_info) != message.signed_payload.sender_info_hash {
                return Err(DhtError::ContentHashMismatch(index));
            }
        }

        Ok(())
    }
}

/// `/kiyeovo-group-offline/...` — version-monotone, tiebreak `last_updated`.
/// Each message is individually signed by the writer's app-signing key
/// (the 32-byte key embedded in the path), so the store itself carries no
/// top-level signature.
pub struct GroupOfflineValidator;

impl Validator for GroupOfflineValidator {
    fn validate(&self, key_path: &str, raw_value: &[u8]) -> Result<()> {
        let parts = parse_group_offline_key(key_path)?;
        let sender_pub = VerifyingKey::from_bytes(&parts.sender_sign_pub)?;

        let json = compression::decompress(raw_value)?;
        let store: GroupOfflineStore = serde_json::from_slice(&json)?;

        for (index, message) in store.messages.iter().enumerate() {
            if message.group_id != parts.group_id {
                return Err(DhtError::FieldMismatch("group_id"));
            }
            if message.key_version != parts.key_version {
                return Err(DhtError::FieldMismatch("key_version"));
            }
            let signed_bytes =
                serde_json::to_vec(&message.signed_fields()).map_err(DhtError::Json)?;
            sender_pub
                .verify(&signed_bytes, &Signature::from_bytes(&message.signature))
                .map_err(|_| DhtError::InvalidMessageSignature(index))?;
        }

        Ok(())
    }
}

/// `/kiyeovo-group-info-latest/...` — version-monotone; same version
/// requires an identical `stateHash` (enforced by the selector, not here).
pub struct GroupInfoLatestValidator;

impl Validator for GroupInfoLatestValidator {
    fn validate(&self, key_path: &str, raw_value: &[u8]) -> Result<()> {
        let parts = parse_group_info_latest_key(key_path)?;
        let creator_pub = VerifyingKey::from_bytes(&parts.creator_sign_pub)?;

        let record: GroupInfoLatest = serde_json::from_slice(raw_value)?;
        if record.group_id != parts.group_id {
            return Err(DhtError::FieldMismatch("group_id"));
        }

        let signed_bytes = signing::group_info_latest_signed_bytes(&record);
        creator_pub
            .verify(&signed_bytes, &Signature::from_bytes(&record.creator_signature))
            .map_err(|_| DhtError::InvalidStoreSignature)?;

        Ok(())
    }
}

/// `/kiyeovo-group-info-v/...` — byte-identical re-publish only; immutable
/// once written (enforced by the selector).
pub struct GroupInfoVersionedValidator;

impl Validator for GroupInfoVersionedValidator {
    fn validate(&self, key_path: &str, raw_value: &[u8]) -> Result<()> {
        let parts = parse_group_info_versioned_key(key_path)?;
        let creator_pub = VerifyingKey::from_bytes(&parts.creator_sign_pub)?;

        let record: GroupInfoVersioned = serde_json::from_slice(raw_value)?;
        if record.group_id != parts.group_id {
            return Err(DhtError::FieldMismatch("group_id"));
        }
        if record.version != parts.version {
            return Err(DhtError::FieldMismatch("version"));
        }

        let signed_bytes = signing::group_info_versioned_signed_bytes(&record);
        creator_pub
            .verify(&signed_bytes, &Signature::from_bytes(&record.creator_signature))
            .map_err(|_| DhtError::InvalidStoreSignature)?;

        Ok(())
    }
}

/// Look up the validator for a key path's namespace, or `None` if it does
/// not belong to any registered Kiyeovo namespace.
pub fn validator_for(key_path: &str) -> Option<Box<dyn Validator>> {
    let namespace = key_path.strip_prefix('/')?.split('/').next()?;
    match namespace {
        keys::DIRECT_OFFLINE_NS => Some(Box::new(DirectOfflineValidator)),
        keys::GROUP_OFFLINE_NS => Some(Box::new(GroupOfflineValidator)),
        keys::GROUP_INFO_LATEST_NS => Some(Box::new(GroupInfoLatestValidator)),
        keys::GROUP_INFO_VERSIONED_NS => Some(Box::new(GroupInfoVersionedValidator)),
        _ => None,
    }
}
