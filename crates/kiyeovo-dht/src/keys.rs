//! The four DHT key-path namespaces (spec §6) and their segment parsing.
//!
//! Every key path is `/`-delimited ASCII with base64url-encoded binary
//! segments. Building and parsing share these functions so a validator
//! rejects exactly the paths a writer could never have produced.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;
use uuid::Uuid;

use kiyeovo_types::GroupId;

pub const DIRECT_OFFLINE_NS: &str = "kiyeovo-offline";
pub const GROUP_OFFLINE_NS: &str = "kiyeovo-group-offline";
pub const GROUP_INFO_LATEST_NS: &str = "kiyeovo-group-info-latest";
pub const GROUP_INFO_VERSIONED_NS: &str = "kiyeovo-group-info-v";

#[derive(Debug, Error)]
pub enum KeyPathError {
    #[error("key path does not start with '/'")]
    MissingLeadingSlash,

    #[error("key path has {got} segments, expected {expected}")]
    WrongSegmentCount { got: usize, expected: usize },

    #[error("key path namespace is '{got}', expected '{expected}'")]
    WrongNamespace { got: String, expected: &'static str },

    #[error("invalid base64url segment: {0}")]
    BadBase64(#[from] base64::DecodeError),

    #[error("public key segment decodes to {0} bytes, expected 32")]
    WrongPublicKeyLength(usize),

    #[error("invalid group id segment: {0}")]
    BadGroupId(#[from] uuid::Error),

    #[error("invalid integer segment: {0}")]
    BadInteger(#[from] std::num::ParseIntError),
}

type Result<T> = std::result::Result<T, KeyPathError>;

fn split_segments(path: &str, namespace: &'static str, expected_len: usize) -> Result<Vec<&str>> {
    let rest = path
        .strip_prefix('/')
        .ok_or(KeyPathError::MissingLeadingSlash)?;
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() != expected_len {
        return Err(KeyPathError::WrongSegmentCount {
            got: segments.len(),
            expected: expected_len,
        });
    }
    if segments[0] != namespace {
        return Err(KeyPathError::WrongNamespace {
            got: segments[0].to_string(),
            expected: namespace,
        });
    }
    Ok(segments)
}

fn decode_pubkey(segment: &str) -> Result<[u8; 32]> {
    let raw = URL_SAFE_NO_PAD.decode(segment)?;
    raw.try_into()
        .map_err(|v: Vec<u8>| KeyPathError::WrongPublicKeyLength(v.len()))
}

/// `/kiyeovo-offline/{bucket_secret_b64url}/{sender_sign_pub_b64url}`
pub fn direct_offline_key(bucket_secret: &[u8], sender_sign_pub: &[u8; 32]) -> String {
    format!(
        "/{DIRECT_OFFLINE_NS}/{}/{}",
        URL_SAFE_NO_PAD.encode(bucket_secret),
        URL_SAFE_NO_PAD.encode(sender_sign_pub),
    )
}

pub struct DirectOfflineKeyParts {
    pub bucket_secret: Vec<u8>,
    pub sender_sign_pub: [u8; 32],
}

pub fn parse_direct_offline_key(path: &str) -> Result<DirectOfflineKeyParts> {
    let segments = split_segments(path, DIRECT_OFFLINE_NS, 3)?;
    Ok(DirectOfflineKeyParts {
        bucket_secret: URL_SAFE_NO_PAD.decode(segments[1])?,
        sender_sign_pub: decode_pubkey(segments[2])?,
    })
}

/// `/kiyeovo-group-offline/{groupId}/{keyVersion}/{sender_sign_pub_b64url}`
pub fn group_offline_key(group_id: GroupId, key_version: u64, sender_sign_pub: &[u8; 32]) -> String {
    format!(
        "/{GROUP_OFFLINE_NS}/{group_id}/{key_version}/{}",
        URL_SAFE_NO_PAD.encode(sender_sign_pub),
    )
}

pub struct GroupOfflineKeyParts {
    pub group_id: GroupId,
    pub key_version: u64,
    pub sender_sign_pub: [u8; 32],
}

pub fn parse_group_offline_key(path: &str) -> Result<GroupOfflineKeyParts> {
    let segments = split_segments(path, GROUP_OFFLINE_NS, 4)?;
    Ok(GroupOfflineKeyParts {
        group_id: Uuid::parse_str(segments[1])?,
        key_version: segments[2].parse()?,
        sender_sign_pub: decode_pubkey(segments[3])?,
    })
}

/// `/kiyeovo-group-info-latest/{groupId}/{creator_sign_pub_b64url}`
pub fn group_info_latest_key(group_id: GroupId, creator_sign_pub: &[u8; 32]) -> String {
    format!(
        "/{GROUP_INFO_LATEST_NS}/{group_id}/{}",
        URL_SAFE_NO_PAD.encode(creator_sign_pub),
    )
}

pub struct GroupInfoLatestKeyParts {
    pub group_id: GroupId,
    pub creator_sign_pub: [u8; 32],
}

pub fn parse_group_info_latest_key(path: &str) -> Result<GroupInfoLatestKeyParts> {
    let segments = split_segments(path, GROUP_INFO_LATEST_NS, 3)?;
    Ok(GroupInfoLatestKeyParts {
        group_id: Uuid::parse_str(segments[1])?,
        creator_sign_pub: decode_pubkey(segments[2])?,
    })
}

/// `/kiyeovo-group-info-v/{groupId}/{creator_sign_pub_b64url}/{version}`
pub fn group_info_versioned_key(group_id: GroupId, creator_sign_pub: &[u8; 32], version: u64) -> String {
    format!(
        "/{GROUP_INFO_VERSIONED_NS}/{group_id}/{}/{version}",
        URL_SAFE_NO_PAD.encode(creator_sign_pub),
    )
}

pub struct GroupInfoVersionedKeyParts {
    pub group_id: GroupId,
    pub creator_sign_pub: [u8; 32],
    pub version: u64,
}

pub fn parse_group_info_versioned_key(path: &str) -> Result<GroupInfoVersionedKeyParts> {
    let segments = split_segments(path, GROUP_INFO_VERSIONED_NS, 4)?;
    Ok(GroupInfoVersionedKeyParts {
        group_id: Uuid::parse_str(segments[1])?,
        creator_sign_pub: decode_pubkey(segments[2])?,
        version: segments[3].parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_offline_key_roundtrip() {
        let secret = [1u8; 16];
        let pubkey = [2u8; 32];
        let path = direct_offline_key(&secret, &pubkey);
        let parts = parse_direct_offline_key(&path).expect("parse");
        assert_eq!(parts.bucket_secret, secret.to_vec());
        assert_eq!(parts.sender_sign_pub, pubkey);
    }

    #[test]
    fn test_group_offline_key_roundtrip() {
        let group_id = Uuid::new_v4();
        let pubkey = [3u8; 32];
        let path = group_offline_key(group_id, 7, &pubkey);
        let parts = parse_group_offline_key(&path).expect("parse");
        assert_eq!(parts.group_id, group_id);
        assert_eq!(parts.key_version, 7);
        assert_eq!(parts.sender_sign_pub, pubkey);
    }

    #[test]
    fn test_group_info_latest_key_roundtrip() {
        let group_id = Uuid::new_v4();
        let pubkey = [4u8; 32];
        let path = group_info_latest_key(group_id, &pubkey);
        let parts = parse_group_info_latest_key(&path).expect("parse");
        assert_eq!(parts.group_id, group_id);
        assert_eq!(parts.creator_sign_pub, pubkey);
    }

    #[test]
    fn test_group_info_versioned_key_roundtrip() {
        let group_id = Uuid::new_v4();
        let pubkey = [5u8; 32];
        let path = group_info_versioned_key(group_id, &pubkey, 3);
        let parts = parse_group_info_versioned_key(&path).expect("parse");
        assert_eq!(parts.group_id, group_id);
        assert_eq!(parts.creator_sign_pub, pubkey);
        assert_eq!(parts.version, 3);
    }

    #[test]
    fn test_wrong_namespace_rejected() {
        let path = format!("/{GROUP_OFFLINE_NS}/not-a-real-path");
        assert!(matches!(
            parse_direct_offline_key(&path),
            Err(KeyPathError::WrongSegmentCount { .. })
        ));
    }

    #[test]
    fn test_missing_leading_slash_rejected() {
        let path = "kiyeovo-offline/a/b";
        assert!(matches!(
            parse_direct_offline_key(path),
            Err(KeyPathError::MissingLeadingSlash)
        ));
    }

    #[test]
    fn test_wrong_public_key_length_rejected() {
        let path = format!(
            "/{DIRECT_OFFLINE_NS}/{}/{}",
            URL_SAFE_NO_PAD.encode(b"secret"),
            URL_SAFE_NO_PAD.encode(b"too-short"),
        );
        assert!(matches!(
            parse_direct_offline_key(&path),
            Err(KeyPathError::WrongPublicKeyLength(_))
        ));
    }
}
