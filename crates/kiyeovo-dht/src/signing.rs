//! Canonical signed-byte encodings for every record a [`crate::validators`]
//! validator checks. Writers (in `kiyeovo-offline`, `kiyeovo-group-offline`,
//! `kiyeovo-groupinfo`) must sign exactly these bytes; living here keeps the
//! writer and the validator from drifting apart.

use std::collections::BTreeMap;

use kiyeovo_crypto::blake3::encode_multi_field;
use kiyeovo_types::group::RosterMember;
use kiyeovo_types::groupinfo::{GroupInfoLatest, GroupInfoVersioned};
use kiyeovo_types::offline_direct::{OfflineMessageSignedPayload, OfflineStoreSignedPayload};
use kiyeovo_types::GroupId;

/// Bytes signed for a whole direct offline store (spec §4.3 "Signature
/// contract").
pub fn offline_store_signed_bytes(payload: &OfflineStoreSignedPayload) -> Vec<u8> {
    let mut ids = Vec::with_capacity(payload.message_ids.len() * 16);
    for id in &payload.message_ids {
        ids.extend_from_slice(id.as_bytes());
    }
    encode_multi_field(&[
        &ids,
        &payload.version.to_be_bytes(),
        &payload.timestamp.to_be_bytes(),
        payload.bucket_key.as_bytes(),
    ])
}

/// Bytes signed for one direct offline message.
pub fn offline_message_signed_bytes(payload: &OfflineMessageSignedPayload) -> Vec<u8> {
    encode_multi_field(&[
        &payload.content_hash,
        &payload.sender_info_hash,
        &payload.timestamp.to_be_bytes(),
        payload.bucket_key.as_bytes(),
    ])
}

/// Bytes the creator signs for a `group-info-latest` record.
pub fn group_info_latest_signed_bytes(record: &GroupInfoLatest) -> Vec<u8> {
    encode_multi_field(&[
        record.group_id.as_bytes(),
        &record.latest_version.to_be_bytes(),
        &record.latest_state_hash,
        &record.last_updated.to_be_bytes(),
    ])
}

/// Bytes the creator signs for a `group-info-v` record.
pub fn group_info_versioned_signed_bytes(record: &GroupInfoVersioned) -> Vec<u8> {
    encode_multi_field(&[
        record.group_id.as_bytes(),
        &record.version.to_be_bytes(),
        &record.prev_version_hash,
        &record.state_hash,
        &record.activated_at.to_be_bytes(),
    ])
}

/// The `sha256` of a `group-info-v` record's canonical payload (spec §4.6:
/// "stateHash, sha256 of the canonical payload"). Callers pass
/// `member_signing_pub_keys` and `sender_seq_boundaries` as `BTreeMap`s so
/// the key ordering is fixed before it reaches this function; the record's
/// own `HashMap` fields are built from these maps afterward.
#[allow(clippy::too_many_arguments)]
pub fn group_info_state_hash(
    group_id: &GroupId,
    version: u64,
    prev_version_hash: &[u8; 32],
    members: &[RosterMember],
    member_signing_pub_keys: &BTreeMap<String, [u8; 32]>,
    activated_at: u64,
    sender_seq_boundaries: &BTreeMap<String, u64>,
) -> [u8; 32] {
    let mut member_fields = Vec::new();
    for member in members {
        member_fields.push(encode_multi_field(&[
            &member.peer_id,
            member.username.as_bytes(),
            &member.signing_pub,
            &member.offline_rsa_pub,
        ]));
    }
    let members_bytes = encode_multi_field(
        &member_fields.iter().map(|f| f.as_slice()).collect::<Vec<_>>(),
    );

    let mut pubkey_fields = Vec::new();
    for (peer_hex, pub_key) in member_signing_pub_keys {
        pubkey_fields.push(encode_multi_field(&[peer_hex.as_bytes(), pub_key]));
    }
    let pubkeys_bytes =
        encode_multi_field(&pubkey_fields.iter().map(|f| f.as_slice()).collect::<Vec<_>>());

    let mut boundary_fields = Vec::new();
    for (peer_hex, seq) in sender_seq_boundaries {
        boundary_fields.push(encode_multi_field(&[peer_hex.as_bytes(), &seq.to_be_bytes()]));
    }
    let boundaries_bytes =
        encode_multi_field(&boundary_fields.iter().map(|f| f.as_slice()).collect::<Vec<_>>());

    let payload = encode_multi_field(&[
        group_id.as_bytes(),
        &version.to_be_bytes(),
        prev_version_hash,
        &members_bytes,
        &pubkeys_bytes,
        &activated_at.to_be_bytes(),
        &boundaries_bytes,
    ]);
    kiyeovo_crypto::sha256::hash(&payload)
}
