//! Group key rotation (spec §4.4 "Key rotation"): generate a fresh epoch
//! key, bump `key_version`, persist it to Group Key History, update the
//! chat row, and publish the new roster via group-info (C7).

use rand::RngCore;
use rusqlite::Connection;

use kiyeovo_db::queries::{chats, group_key_history};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::group::{GroupKeyHistoryEntry, RosterMember};
use kiyeovo_types::identity::Identity;
use kiyeovo_types::{ChatId, GroupId, PeerId};

use crate::GroupError;

pub struct RotatedEpoch {
    pub key_version: u64,
    pub group_key: [u8; 32],
}

/// `join` adds a target to the participant set, `leave`/`kick` removes
/// them; either way the caller passes the *post-event* roster. Existing
/// members learn the new key via `GROUP_STATE_UPDATE`; a new joiner (if
/// any) learns it via `GROUP_WELCOME` — this function only produces the
/// key and the durable state, it does not send anything.
#[allow(clippy::too_many_arguments)]
pub async fn rotate_key(
    conn: &Connection,
    dht: &dyn DhtClient,
    identity: &Identity,
    chat_id: ChatId,
    group_id: GroupId,
    roster: &[RosterMember],
    own_highest_seq: u64,
    now: u64,
) -> Result<RotatedEpoch, GroupError> {
    let chat = chats::get(conn, &chat_id)?;
    let prev_version = chat.key_version;
    let new_version = prev_version + 1;

    let mut group_key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut group_key);

    let prev_version_hash = if prev_version == 0 {
        [0u8; 32]
    } else {
        group_key_history::get(conn, &group_id, prev_version)?.state_hash
    };

    let roster_peer_ids: Vec<PeerId> = roster.iter().map(|m| m.peer_id).collect();
    let boundaries = kiyeovo_groupinfo::compute_sender_seq_boundaries(
        conn,
        &group_id,
        new_version,
        &roster_peer_ids,
        &identity.id,
        own_highest_seq,
    )?;

    let versioned = kiyeovo_groupinfo::build_versioned_record(
        identity,
        group_id,
        new_version,
        prev_version_hash,
        roster.to_vec(),
        now,
        boundaries,
    );
    let latest = kiyeovo_groupinfo::build_latest_record(
        identity,
        group_id,
        new_version,
        versioned.state_hash,
        now,
    );
    kiyeovo_groupinfo::publish(dht, &identity.sign_pub, &versioned, &latest).await?;

    group_key_history::append(
        conn,
        &GroupKeyHistoryEntry {
            group_id,
            key_version: new_version,
            key: group_key,
            state_hash: versioned.state_hash,
            used_until: None,
        },
    )?;
    if prev_version > 0 {
        group_key_history::stamp_used_until(conn, &group_id, prev_version, now)?;
    }
    chats::apply_key_rotation(conn, &chat_id, new_version, &roster_peer_ids)?;

    Ok(RotatedEpoch { key_version: new_version, group_key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiyeovo_crypto::ed25519::KeyPair;
    use kiyeovo_types::chat::{Chat, ChatStatus, ChatType, GroupStatus};
    use kiyeovo_types::contact::User;
    use kiyeovo_transport::DhtEvent;
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

    struct AlwaysAcksDht;

    #[async_trait::async_trait]
    impl DhtClient for AlwaysAcksDht {
        async fn get(&self, _key: &[u8]) -> Vec<DhtEvent> {
            vec![DhtEvent::Done]
        }
        async fn put(&self, _key: &[u8], _value: &[u8]) -> Vec<DhtEvent> {
            vec![DhtEvent::PeerResponse { peer_id: "p0".into() }, DhtEvent::Done]
        }
    }

    fn sample_group_chat(group_id: GroupId, creator: PeerId) -> Chat {
        Chat {
            id: uuid::Uuid::new_v4(),
            chat_type: ChatType::Group,
            name: "team".into(),
            peer_id: None,
            created_by: creator,
            status: ChatStatus::Active,
            group_id: Some(group_id),
            group_creator: Some(creator),
            group_status: Some(GroupStatus::Active),
            key_version: 0,
            offline_bucket_secret: None,
            offline_last_read_ts: 0,
            offline_last_ack_sent: 0,
            trusted_out_of_band: false,
            muted: false,
            participants: vec![creator],
        }
    }

    #[tokio::test]
    async fn test_first_rotation_bumps_to_version_one() {
        let conn = kiyeovo_db::open_memory().expect("open");
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let group_id = uuid::Uuid::new_v4();
        let chat = sample_group_chat(group_id, identity.id);
        chats::insert(&conn, &chat).expect("insert chat");

        let roster = vec![RosterMember {
            peer_id: identity.id,
            username: "alice".into(),
            signing_pub: identity.sign_pub,
            offline_rsa_pub: vec![],
        }];
        let dht = AlwaysAcksDht;
        let rotated = rotate_key(&conn, &dht, &identity, chat.id, group_id, &roster, 0, 1000)
            .await
            .expect("rotate");
        assert_eq!(rotated.key_version, 1);

        let loaded = chats::get(&conn, &chat.id).expect("get");
        assert_eq!(loaded.key_version, 1);
        let entry = group_key_history::get(&conn, &group_id, 1).expect("history");
        assert!(entry.used_until.is_none());
    }

    #[tokio::test]
    async fn test_second_rotation_stamps_prior_epoch_used_until() {
        let conn = kiyeovo_db::open_memory().expect("open");
        let kp = KeyPair::generate();
        let identity = identity_for(&kp);
        let group_id = uuid::Uuid::new_v4();
        let chat = sample_group_chat(group_id, identity.id);
        chats::insert(&conn, &chat).expect("insert chat");

        let roster = vec![RosterMember {
            peer_id: identity.id,
            username: "alice".into(),
            signing_pub: identity.sign_pub,
            offline_rsa_pub: vec![],
        }];
        let dht = AlwaysAcksDht;
        rotate_key(&conn, &dht, &identity, chat.id, group_id, &roster, 0, 1000)
            .await
            .expect("first rotation");
        rotate_key(&conn, &dht, &identity, chat.id, group_id, &roster, 0, 2000)
            .await
            .expect("second rotation");

        let first = group_key_history::get(&conn, &group_id, 1).expect("history v1");
        assert_eq!(first.used_until, Some(2000));
        let second = group_key_history::get(&conn, &group_id, 2).expect("history v2");
        assert!(second.used_until.is_none());
    }
}
