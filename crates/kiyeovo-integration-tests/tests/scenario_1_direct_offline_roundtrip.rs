//! Integration test: direct offline bucket round trip and ACK piggybacking
//! (spec §8 scenario 1, spec §4.3).
//!
//! Exercises:
//! 1. Two peers establish a mutual direct chat sharing one
//!    `offline_bucket_secret` (out of band, as a completed key exchange
//!    would leave it).
//! 2. Alice RSA-seals a message into her outgoing bucket via
//!    `kiyeovo_offline::put`.
//! 3. Bob polls Alice's bucket via `kiyeovo_offline::poll_bucket`, unseals
//!    it, and persists it.
//! 4. Alice clears the acknowledged message from her own bucket via
//!    `kiyeovo_offline::clear_acknowledged_messages`.
//!
//! Uses kiyeovo-offline (put/poll_bucket/clear_acknowledged_messages),
//! kiyeovo-identity (generate_identity), kiyeovo-db (contacts, chats,
//! messages), and kiyeovo-node's `FakeDht`.

use std::time::Duration;

use rusqlite::Connection;
use uuid::Uuid;

use kiyeovo_db::queries::{chats, contacts, messages};
use kiyeovo_identity::{decode_rsa_private, decode_rsa_public, generate_identity};
use kiyeovo_node::fake::FakeDht;
use kiyeovo_offline::{BucketMirror, OfflineConfig, SenderInfo};
use kiyeovo_types::chat::{Chat, ChatStatus, ChatType};
use kiyeovo_types::contact::User;
use kiyeovo_types::identity::Identity;

struct Peer {
    identity: Identity,
    conn: Connection,
    mirror: BucketMirror,
}

fn make_peer() -> Peer {
    Peer {
        identity: generate_identity(),
        conn: kiyeovo_db::open_memory().expect("open in-memory db"),
        mirror: BucketMirror::new(Duration::from_secs(300)),
    }
}

/// Introduce `a` and `b` as mutual contacts and give each a direct chat
/// row sharing one `offline_bucket_secret`, as a completed key exchange
/// would leave them (spec §3: `Chat.offline_bucket_secret`).
fn connect(a: &Peer, a_username: &str, b: &Peer, b_username: &str, now: u64) -> [u8; 32] {
    let bucket_secret = {
        let mut secret = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut secret);
        secret
    };

    contacts::upsert(
        &a.conn,
        &User {
            peer_id: b.identity.id,
            username: b_username.to_string(),
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
            username: a_username.to_string(),
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
            name: b_username.to_string(),
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
    .expect("a's chat");
    chats::insert(
        &b.conn,
        &Chat {
            id: Uuid::new_v4(),
            chat_type: ChatType::Direct,
            name: a_username.to_string(),
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
    .expect("b's chat");

    bucket_secret
}

#[tokio::test]
#[ignore]
async fn scenario_1_direct_offline_roundtrip() {
    let mut alice = make_peer();
    let bob = make_peer();
    let now = 1_000_000u64;

    let bucket_secret = connect(&alice, "alice", &bob, "bob", now);
    let bob_chat = chats::get_by_peer_id(&bob.conn, &alice.identity.id)
        .expect("lookup")
        .expect("bob's chat with alice exists");

    let dht = FakeDht::new();
    let config = OfflineConfig::default();

    // ===== Step 1: Alice writes a message into her outgoing bucket =====
    let alice_write_key = kiyeovo_offline::write_key_path(
        &bucket_secret,
        &alice.identity.sign_pub,
        &bob.identity.sign_pub,
    );
    let bob_rsa_pub = decode_rsa_public(&bob.identity.offline_rsa_pub).expect("decode bob rsa pub");
    let sender_info = SenderInfo {
        peer_id: alice.identity.id,
        username: "alice".to_string(),
        offline_ack_timestamp: None,
    };
    let message_id = Uuid::new_v4();

    kiyeovo_offline::put(
        &mut alice.mirror,
        &dht,
        &config,
        &alice_write_key,
        &alice.identity,
        &bob_rsa_pub,
        &sender_info,
        message_id,
        b"hey bob, are you around?",
        now + 14 * 24 * 60 * 60 * 1000,
        now,
    )
    .await
    .expect("alice puts message");

    // ===== Step 2: Bob polls Alice's bucket and receives the message =====
    let bob_read_key =
        kiyeovo_offline::read_key_path(&bucket_secret, &bob.identity.sign_pub, &alice.identity.sign_pub);
    assert_eq!(bob_read_key, alice_write_key, "bob's read key must match alice's write key");

    let bob_rsa_priv = decode_rsa_private(&bob.identity.offline_rsa_priv).expect("decode bob rsa priv");
    let outcome = kiyeovo_offline::poll_bucket(&dht, &bob_read_key, &bob_rsa_priv, &bob.conn, bob_chat.id, now + 10)
        .await
        .expect("bob polls");

    assert_eq!(outcome.received.len(), 1, "bob must receive exactly one message");
    assert_eq!(outcome.received[0].content, "hey bob, are you around?");
    assert_eq!(outcome.received[0].sender_peer_id, alice.identity.id);
    assert!(
        messages::exists(&bob.conn, &message_id).expect("exists check"),
        "message must be persisted in bob's db"
    );

    // Re-polling must not duplicate the message (dedup by OfflineMessage::id).
    let second_outcome =
        kiyeovo_offline::poll_bucket(&dht, &bob_read_key, &bob_rsa_priv, &bob.conn, bob_chat.id, now + 20)
            .await
            .expect("bob polls again");
    assert!(second_outcome.received.is_empty(), "re-polling must not re-deliver the same message");

    // ===== Step 3: Alice clears the now-acknowledged message =====
    kiyeovo_offline::clear_acknowledged_messages(
        &mut alice.mirror,
        &dht,
        &alice_write_key,
        &alice.identity,
        now,
        now + 30,
    )
    .await
    .expect("alice clears acknowledged messages");

    let store = alice.mirror.get(&alice_write_key).expect("mirrored store still present");
    assert!(store.messages.is_empty(), "cleared store must have no remaining messages");
    assert_eq!(store.version, 2, "clearing republishes, bumping version again");
}
