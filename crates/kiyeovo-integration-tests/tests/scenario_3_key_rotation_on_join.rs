//! Integration test: key rotation as members join one after another (spec
//! §8 scenario 3, spec §4.4 "Key rotation").
//!
//! A group's epoch key bumps by exactly one version per accepted join. A
//! member already in the group learns the new epoch key via a
//! `GROUP_STATE_UPDATE` rather than a `GROUP_WELCOME`, and the new epoch's
//! group-info record pins the retiring epoch's per-sender sequence
//! boundaries so lingering offline messages written under the old key can
//! still be read during the grace window (`kiyeovo-group-offline`, C6).
//!
//! Uses kiyeovo-group (create_group/dispatch/invitee::respond_to_invite),
//! kiyeovo-groupinfo (fetch_versioned), kiyeovo-db
//! (group_key_history, group_offline), and kiyeovo-offline.

use std::time::Duration;

use rusqlite::Connection;
use uuid::Uuid;

use kiyeovo_db::queries::{chats, contacts, group_offline};
use kiyeovo_group::dispatch::{dispatch, GroupEvent};
use kiyeovo_group::{create_group, GroupConfig};
use kiyeovo_identity::generate_identity;
use kiyeovo_node::fake::FakeDht;
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_types::chat::{Chat, ChatStatus, ChatType, GroupStatus};
use kiyeovo_types::contact::User;
use kiyeovo_types::control::GroupControlMessage;
use kiyeovo_types::identity::Identity;

struct Peer {
    identity: Identity,
    username: String,
    conn: Connection,
    mirror: BucketMirror,
}

fn make_peer(username: &str) -> Peer {
    Peer {
        identity: generate_identity(),
        username: username.to_string(),
        conn: kiyeovo_db::open_memory().expect("open in-memory db"),
        mirror: BucketMirror::new(Duration::from_secs(300)),
    }
}

fn connect(a: &Peer, b: &Peer, now: u64) {
    let bucket_secret = {
        let mut secret = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut secret);
        secret
    };

    contacts::upsert(
        &a.conn,
        &User {
            peer_id: b.identity.id,
            username: b.username.clone(),
            sign_pub: b.identity.sign_pub,
            offline_rsa_pub: b.identity.offline_rsa_pub.clone(),
            handshake_sig: None,
            blocked: false,
            added_at: now,
        },
    )
    .expect("a adds b");
    contacts::upsert(
        &b.conn,
        &User {
            peer_id: a.identity.id,
            username: a.username.clone(),
            sign_pub: a.identity.sign_pub,
            offline_rsa_pub: a.identity.offline_rsa_pub.clone(),
            handshake_sig: None,
            blocked: false,
            added_at: now,
        },
    )
    .expect("b adds a");

    chats::insert(
        &a.conn,
        &Chat {
            id: Uuid::new_v4(),
            chat_type: ChatType::Direct,
            name: b.username.clone(),
            peer_id: Some(b.identity.id),
            created_by: a.identity.id,
            status: ChatStatus::Active,
            group_id: None,
            group_creator: None,
            group_status: None,
            key_version: 0,
            offline_bucket_secret: Some(bucket_secret),
            offline_last_read_ts: 0,
            offline_last_ack_sent: 0,
            trusted_out_of_band: false,
            muted: false,
            participants: vec![],
        },
    )
    .expect("a's direct chat with b");
    chats::insert(
        &b.conn,
        &Chat {
            id: Uuid::new_v4(),
            chat_type: ChatType::Direct,
            name: a.username.clone(),
            peer_id: Some(a.identity.id),
            created_by: a.identity.id,
            status: ChatStatus::Active,
            group_id: None,
            group_creator: None,
            group_status: None,
            key_version: 0,
            offline_bucket_secret: Some(bucket_secret),
            offline_last_read_ts: 0,
            offline_last_ack_sent: 0,
            trusted_out_of_band: false,
            muted: false,
            participants: vec![],
        },
    )
    .expect("b's direct chat with a");
}

async fn deliver_control_messages(
    dht: &FakeDht,
    from: &Peer,
    target: &mut Peer,
    group_config: &GroupConfig,
    offline_config: &OfflineConfig,
    now: u64,
) -> Vec<(GroupControlMessage, GroupEvent)> {
    let chat = chats::get_by_peer_id(&target.conn, &from.identity.id)
        .expect("lookup")
        .expect("direct chat exists");
    let bucket_secret = chat.offline_bucket_secret.expect("bucket secret present");

    let read_key =
        kiyeovo_offline::read_key_path(&bucket_secret, &target.identity.sign_pub, &from.identity.sign_pub);
    let rsa_priv =
        kiyeovo_identity::decode_rsa_private(&target.identity.offline_rsa_priv).expect("decode rsa priv");

    let outcome = kiyeovo_offline::poll_bucket(dht, &read_key, &rsa_priv, &target.conn, chat.id, now)
        .await
        .expect("poll control bucket");

    let mut delivered = Vec::new();
    for message in &outcome.received {
        let control: GroupControlMessage =
            serde_json::from_str(&message.content).expect("control message deserializes");
        let event = dispatch(
            &target.conn,
            &mut target.mirror,
            dht,
            offline_config,
            group_config,
            &target.identity,
            &target.username,
            from.identity.id,
            &control,
            now,
        )
        .await
        .expect("dispatch control message");
        delivered.push((control, event));
    }
    delivered
}

fn invite_id_from(delivered: &[(GroupControlMessage, GroupEvent)]) -> String {
    match &delivered[0].0 {
        GroupControlMessage::Invite(invite) => invite.invite_id.clone(),
        other => panic!("expected Invite, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn scenario_3_key_rotation_on_join() {
    let mut creator = make_peer("carol");
    let mut x = make_peer("xavier");
    let mut z = make_peer("zelda");
    let now = 1_000_000u64;

    connect(&creator, &x, now);
    connect(&creator, &z, now);

    let dht = FakeDht::new();
    let offline_config = OfflineConfig::default();
    let group_config = GroupConfig::default();

    let creator_chat_id = create_group(
        &creator.conn,
        &mut creator.mirror,
        &dht,
        &offline_config,
        &group_config,
        &creator.identity,
        &creator.username,
        "project room",
        &[x.identity.id, z.identity.id],
        now,
    )
    .await
    .expect("create group");

    let creator_chat = chats::get(&creator.conn, &creator_chat_id).expect("creator's chat");
    let group_id = creator_chat.group_id.expect("group id assigned");

    // ===== X accepts first, rotating the group to epoch 1 =====
    let x_invite_delivered =
        deliver_control_messages(&dht, &creator, &mut x, &group_config, &offline_config, now + 10).await;
    let x_invite_id = invite_id_from(&x_invite_delivered);
    deliver_control_messages(&dht, &x, &mut creator, &group_config, &offline_config, now + 15).await;

    kiyeovo_group::invitee::respond_to_invite(
        &x.conn,
        &mut x.mirror,
        &dht,
        &offline_config,
        &group_config,
        &x.identity,
        &x.username,
        group_id,
        &x_invite_id,
        true,
        now + 20,
    )
    .await
    .expect("x accepts");

    deliver_control_messages(&dht, &x, &mut creator, &group_config, &offline_config, now + 25).await;
    let creator_chat_at_v1 = chats::get(&creator.conn, &creator_chat_id).expect("creator's chat");
    assert_eq!(creator_chat_at_v1.key_version, 1, "x's acceptance rotates to epoch 1");

    deliver_control_messages(&dht, &creator, &mut x, &group_config, &offline_config, now + 30).await;
    let x_chat_at_v1 =
        chats::get_by_group_id(&x.conn, &group_id).expect("lookup").expect("x's chat row exists");
    assert_eq!(x_chat_at_v1.group_status, Some(GroupStatus::Active));
    assert_eq!(x_chat_at_v1.key_version, 1);

    // Simulate the creator having already seen 3 of x's epoch-1 messages
    // before the next rotation, so the epoch-2 boundary record pins a
    // non-trivial cutoff for x (spec §4.4: "sender_seq_boundaries records,
    // per sender, how far into the retiring epoch their messages are still
    // readable").
    group_offline::update_member_seq(&creator.conn, &group_id, 1, &x.identity.id, 3)
        .expect("seed creator's view of x's epoch-1 progress");

    // ===== Z accepts second, rotating the group to epoch 2 =====
    let z_invite_delivered =
        deliver_control_messages(&dht, &creator, &mut z, &group_config, &offline_config, now + 40).await;
    let z_invite_id = invite_id_from(&z_invite_delivered);
    deliver_control_messages(&dht, &z, &mut creator, &group_config, &offline_config, now + 45).await;

    kiyeovo_group::invitee::respond_to_invite(
        &z.conn,
        &mut z.mirror,
        &dht,
        &offline_config,
        &group_config,
        &z.identity,
        &z.username,
        group_id,
        &z_invite_id,
        true,
        now + 50,
    )
    .await
    .expect("z accepts");

    deliver_control_messages(&dht, &z, &mut creator, &group_config, &offline_config, now + 55).await;
    let creator_chat_at_v2 = chats::get(&creator.conn, &creator_chat_id).expect("creator's chat");
    assert_eq!(creator_chat_at_v2.key_version, 2, "z's acceptance rotates to epoch 2");
    assert_eq!(
        creator_chat_at_v2.participants.len(),
        3,
        "creator, x, and z are all participants after z joins"
    );

    // Z receives the welcome, carrying the epoch-2 key.
    let z_activation =
        deliver_control_messages(&dht, &creator, &mut z, &group_config, &offline_config, now + 60).await;
    assert!(matches!(z_activation.as_slice(), [(_, GroupEvent::GroupActivated { .. })]));
    let z_chat = chats::get_by_group_id(&z.conn, &group_id).expect("lookup").expect("z's chat row exists");
    assert_eq!(z_chat.group_status, Some(GroupStatus::Active));
    assert_eq!(z_chat.key_version, 2);

    // X, an existing member, learns the new epoch via a GROUP_STATE_UPDATE
    // rather than a GROUP_WELCOME, and bumps straight from 1 to 2.
    let x_state_update =
        deliver_control_messages(&dht, &creator, &mut x, &group_config, &offline_config, now + 65).await;
    assert!(matches!(x_state_update.as_slice(), [(_, GroupEvent::GroupActivated { .. })]));
    let x_chat_at_v2 = chats::get_by_group_id(&x.conn, &group_id).expect("lookup").expect("x's chat row exists");
    assert_eq!(x_chat_at_v2.key_version, 2);

    // The epoch-2 group-info record pins the retiring epoch's boundary for
    // x at the seq we seeded above, and a trivial (zero) boundary for the
    // creator, since its own highest_seq is always passed as 0 on accept.
    let creator_contact_from_x =
        contacts::get(&x.conn, &creator.identity.id).expect("x already trusts the creator");
    let versioned_v2 =
        kiyeovo_groupinfo::fetch_versioned(&dht, group_id, &creator_contact_from_x.sign_pub, 2)
            .await
            .expect("fetch versioned")
            .expect("epoch 2 record published");
    assert_eq!(versioned_v2.boundary_for(&x.identity.id), Some(3));
    assert_eq!(versioned_v2.boundary_for(&creator.identity.id), Some(0));
}
