//! Integration test: a corrupted offline-bucket replica is rejected and the
//! receiver falls back to the last good one (spec §8 scenario 6, spec §4.7
//! "Validators": "flipping any byte breaks exactly one of: message
//! signature, content hash, sender-info hash, bucket binding").
//!
//! A store's top-level signature only covers `message_ids`/`version`/
//! `timestamp`/`bucket_key`, and each message's signature only covers its
//! *claimed* hashes, not the ciphertext blobs themselves. So flipping a
//! byte in `content` after signing leaves both signatures intact but
//! desyncs `blake3::hash(&message.content)` from the signed
//! `content_hash` — exactly the case `DirectOfflineValidator` exists to
//! catch. A real DHT can legitimately hand back more than one replica of
//! the same key while writes are propagating; this drives that case by
//! returning a tampered, higher-version replica alongside the real one in
//! a single `get`.
//!
//! Uses kiyeovo-offline (put/poll_bucket), kiyeovo-dht (validators,
//! compression, signing), kiyeovo-identity, and kiyeovo-db.

use std::time::Duration;

use rusqlite::Connection;
use uuid::Uuid;

use kiyeovo_crypto::blake3;
use kiyeovo_db::queries::{chats, contacts, messages};
use kiyeovo_dht::compression;
use kiyeovo_dht::signing::offline_store_signed_bytes;
use kiyeovo_identity::{decode_rsa_private, decode_rsa_public, generate_identity, sign};
use kiyeovo_node::fake::FakeDht;
use kiyeovo_offline::{BucketMirror, OfflineConfig, SenderInfo};
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::chat::{Chat, ChatStatus, ChatType};
use kiyeovo_types::contact::User;
use kiyeovo_types::identity::Identity;
use kiyeovo_types::offline_direct::OfflineStore;

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

/// A DHT that hands back two replicas of the same key on every `get`: a
/// tampered, higher-version one and the last good one, the way a real DHT
/// can during write propagation.
struct TwoReplicaDht {
    corrupted: Vec<u8>,
    valid: Vec<u8>,
}

#[async_trait::async_trait]
impl DhtClient for TwoReplicaDht {
    async fn get(&self, _key: &[u8]) -> Vec<DhtEvent> {
        vec![
            DhtEvent::Value(self.corrupted.clone()),
            DhtEvent::Value(self.valid.clone()),
            DhtEvent::Done,
        ]
    }
    async fn put(&self, _key: &[u8], _value: &[u8]) -> Vec<DhtEvent> {
        vec![DhtEvent::PeerResponse { peer_id: "p0".into() }, DhtEvent::Done]
    }
}

#[tokio::test]
#[ignore]
async fn scenario_6_corrupted_offline_message() {
    let mut alice = make_peer();
    let bob = make_peer();
    let now = 1_000_000u64;

    let bucket_secret = connect(&alice, "alice", &bob, "bob", now);
    let bob_chat = chats::get_by_peer_id(&bob.conn, &alice.identity.id)
        .expect("lookup")
        .expect("bob's chat with alice exists");

    let put_dht = FakeDht::new();
    let config = OfflineConfig::default();

    let alice_write_key =
        kiyeovo_offline::write_key_path(&bucket_secret, &alice.identity.sign_pub, &bob.identity.sign_pub);
    let bob_rsa_pub = decode_rsa_public(&bob.identity.offline_rsa_pub).expect("decode bob rsa pub");
    let sender_info = SenderInfo {
        peer_id: alice.identity.id,
        username: "alice".to_string(),
        offline_ack_timestamp: None,
    };
    let message_id = Uuid::new_v4();

    // ===== Alice legitimately publishes one message (store version 1) =====
    kiyeovo_offline::put(
        &mut alice.mirror,
        &put_dht,
        &config,
        &alice_write_key,
        &alice.identity,
        &bob_rsa_pub,
        &sender_info,
        message_id,
        b"meet at noon",
        now + 14 * 24 * 60 * 60 * 1000,
        now,
    )
    .await
    .expect("alice puts message");

    let valid_raw = match put_dht.get(alice_write_key.as_bytes()).await.into_iter().next() {
        Some(DhtEvent::Value(raw)) => raw,
        other => panic!("expected a stored value, got {other:?}"),
    };

    // ===== Forge a higher-version replica with a flipped content byte.
    // The message's own signature only binds its *claimed* content_hash,
    // so leaving that hash untouched keeps the message signature valid;
    // only the independent blake3 re-hash in the validator catches it. =====
    let mut store: OfflineStore =
        serde_json::from_slice(&compression::decompress(&valid_raw).expect("decompress valid store"))
            .expect("deserialize valid store");
    store.version += 1;
    store.messages[0].content[0] ^= 0xFF;

    let store_signed_payload = kiyeovo_types::offline_direct::OfflineStoreSignedPayload {
        message_ids: store.messages.iter().map(|m| m.id).collect(),
        version: store.version,
        timestamp: now,
        bucket_key: alice_write_key.clone(),
    };
    let store_signed_bytes = offline_store_signed_bytes(&store_signed_payload);
    store.store_signature = sign(&alice.identity, &store_signed_bytes).to_bytes();
    store.store_signed_payload = store_signed_payload;
    store.last_updated = now + 1;

    assert_ne!(
        blake3::hash(&store.messages[0].content),
        store.messages[0].signed_payload.content_hash,
        "the forged replica's content must no longer match its signed hash"
    );

    let corrupted_raw =
        compression::compress(&serde_json::to_vec(&store).expect("serialize forged store"))
            .expect("compress forged store");

    // ===== Bob polls and sees both replicas in one get, but only the
    // untampered one survives validation =====
    let bob_read_key =
        kiyeovo_offline::read_key_path(&bucket_secret, &bob.identity.sign_pub, &alice.identity.sign_pub);
    let poll_dht = TwoReplicaDht { corrupted: corrupted_raw, valid: valid_raw };
    let bob_rsa_priv = decode_rsa_private(&bob.identity.offline_rsa_priv).expect("decode bob rsa priv");

    let outcome =
        kiyeovo_offline::poll_bucket(&poll_dht, &bob_read_key, &bob_rsa_priv, &bob.conn, bob_chat.id, now + 10)
            .await
            .expect("bob polls despite the tampered replica");

    assert_eq!(outcome.received.len(), 1, "exactly the one legitimate message must be delivered");
    assert_eq!(
        outcome.received[0].content, "meet at noon",
        "the surviving content must be the untampered plaintext, not anything derived from the forged replica"
    );
    assert!(
        messages::exists(&bob.conn, &message_id).expect("exists check"),
        "the legitimate message must still be persisted"
    );
}
