//! Construct and sign the two group-info record shapes (spec §4.6).

use std::collections::{BTreeMap, HashMap};

use kiyeovo_dht::signing::{
    group_info_latest_signed_bytes, group_info_state_hash, group_info_versioned_signed_bytes,
};
use kiyeovo_identity::sign;
use kiyeovo_types::group::RosterMember;
use kiyeovo_types::groupinfo::{GroupInfoLatest, GroupInfoVersioned};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::GroupId;

/// Build and sign a `group-info-v` record. `prev_version_hash` is
/// `[0u8; 32]` for `version == 1` (the chain's root).
pub fn build_versioned_record(
    identity: &Identity,
    group_id: GroupId,
    version: u64,
    prev_version_hash: [u8; 32],
    members: Vec<RosterMember>,
    activated_at: u64,
    sender_seq_boundaries: BTreeMap<String, u64>,
) -> GroupInfoVersioned {
    let member_signing_pub_keys: BTreeMap<String, [u8; 32]> = members
        .iter()
        .map(|m| (hex::encode(m.peer_id), m.signing_pub))
        .collect();

    let state_hash = group_info_state_hash(
        &group_id,
        version,
        &prev_version_hash,
        &members,
        &member_signing_pub_keys,
        activated_at,
        &sender_seq_boundaries,
    );

    let mut record = GroupInfoVersioned {
        group_id,
        version,
        prev_version_hash,
        members,
        member_signing_pub_keys: member_signing_pub_keys.into_iter().collect::<HashMap<_, _>>(),
        activated_at,
        sender_seq_boundaries: sender_seq_boundaries.into_iter().collect::<HashMap<_, _>>(),
        state_hash,
        creator_signature: [0u8; 64],
    };

    let signed_bytes = group_info_versioned_signed_bytes(&record);
    record.creator_signature = sign(identity, &signed_bytes).to_bytes();
    record
}

/// Build and sign the `group-info-latest` pointer for a freshly-published
/// versioned record.
pub fn build_latest_record(
    identity: &Identity,
    group_id: GroupId,
    latest_version: u64,
    latest_state_hash: [u8; 32],
    last_updated: u64,
) -> GroupInfoLatest {
    let mut record = GroupInfoLatest {
        group_id,
        latest_version,
        latest_state_hash,
        last_updated,
        creator_signature: [0u8; 64],
    };
    let signed_bytes = group_info_latest_signed_bytes(&record);
    record.creator_signature = sign(identity, &signed_bytes).to_bytes();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiyeovo_crypto::ed25519::KeyPair;

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

    #[test]
    fn test_versioned_record_signature_verifies() {
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let record = build_versioned_record(
            &identity,
            uuid::Uuid::new_v4(),
            1,
            [0u8; 32],
            vec![],
            1000,
            BTreeMap::new(),
        );
        let signed_bytes = group_info_versioned_signed_bytes(&record);
        kiyeovo_identity::verify(
            &identity.sign_pub,
            &signed_bytes,
            &kiyeovo_crypto::ed25519::Signature::from_bytes(&record.creator_signature),
        )
        .expect("valid signature");
    }

    #[test]
    fn test_latest_record_signature_verifies() {
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let record = build_latest_record(&identity, uuid::Uuid::new_v4(), 1, [7u8; 32], 1000);
        let signed_bytes = group_info_latest_signed_bytes(&record);
        kiyeovo_identity::verify(
            &identity.sign_pub,
            &signed_bytes,
            &kiyeovo_crypto::ed25519::Signature::from_bytes(&record.creator_signature),
        )
        .expect("valid signature");
    }
}
