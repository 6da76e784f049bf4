//! Integration test: retired epoch cleanup (spec §8 scenario 5, spec §4.5
//! "Epoch retirement").
//!
//! An epoch stays around until its grace window has elapsed *and* every
//! roster member has caught up past it, so a slow reader never loses
//! messages written under a key that's already been superseded. Once both
//! conditions hold, its cursors, per-sender seq rows, and key-history
//! entry are pruned so group-local state does not grow without bound
//! across rotations.
//!
//! Uses kiyeovo-group-offline (retire_eligible_epochs, BucketCache) and
//! kiyeovo-db (group_key_history, group_offline).

use std::time::Duration;

use kiyeovo_db::queries::{group_key_history, group_offline};
use kiyeovo_group_offline::{retire_eligible_epochs, BucketCache};
use kiyeovo_transport::{DhtClient, DhtEvent};
use kiyeovo_types::group::GroupKeyHistoryEntry;

struct EmptyDht;

#[async_trait::async_trait]
impl DhtClient for EmptyDht {
    async fn get(&self, _key: &[u8]) -> Vec<DhtEvent> {
        vec![DhtEvent::Done]
    }
    async fn put(&self, _key: &[u8], _value: &[u8]) -> Vec<DhtEvent> {
        vec![DhtEvent::Done]
    }
}

#[tokio::test]
#[ignore]
async fn scenario_5_epoch_retirement() {
    let conn = kiyeovo_db::open_memory().expect("open in-memory db");
    let dht = EmptyDht;
    let mut cache = BucketCache::new(Duration::from_secs(60), 10);
    let group_id = uuid::Uuid::new_v4();
    let alice = [7u8; 32];
    let bob = [8u8; 32];
    let roster = [alice, bob];
    let creator_sign_pub = [0u8; 32];
    let grace_window_ms = 2000;

    // Epoch 1 retired at t=1000; the group is now on epoch 2.
    group_key_history::append(
        &conn,
        &GroupKeyHistoryEntry {
            group_id,
            key_version: 1,
            key: [1u8; 32],
            state_hash: [0u8; 32],
            used_until: Some(1000),
        },
    )
    .expect("seed epoch 1 history");

    // ===== Before the grace window elapses, nothing is retired even
    // though both members have already read everything =====
    group_offline::upsert_cursor(&conn, &group_id, 1, &alice, 5000, None).expect("alice cursor");
    group_offline::upsert_cursor(&conn, &group_id, 1, &bob, 5000, None).expect("bob cursor");

    let too_early = retire_eligible_epochs(&dht, &conn, &mut cache, group_id, &creator_sign_pub, &roster, 2, grace_window_ms, 2500)
        .await
        .expect("retire before grace window");
    assert!(too_early.is_empty(), "the grace window has not elapsed yet (2500 < 1000 + 2000)");

    // ===== Bob hasn't caught up yet: still not eligible even past the
    // grace window deadline =====
    group_offline::upsert_cursor(&conn, &group_id, 1, &bob, 2000, None).expect("bob lags behind");
    let bob_lagging = retire_eligible_epochs(&dht, &conn, &mut cache, group_id, &creator_sign_pub, &roster, 2, grace_window_ms, 4000)
        .await
        .expect("retire while bob lags");
    assert!(too_early.is_empty());
    assert!(bob_lagging.is_empty(), "bob's cursor is behind the deadline, so the epoch must not retire yet");
    assert!(
        group_key_history::get(&conn, &group_id, 1).is_ok(),
        "epoch 1 history must still exist while retirement is pending"
    );

    // ===== Once bob catches up past the deadline, the epoch retires and
    // every piece of its local state is pruned =====
    group_offline::upsert_cursor(&conn, &group_id, 1, &bob, 5000, None).expect("bob catches up");
    let retired = retire_eligible_epochs(&dht, &conn, &mut cache, group_id, &creator_sign_pub, &roster, 2, grace_window_ms, 4000)
        .await
        .expect("retire once roster has caught up");

    assert_eq!(retired, vec![1]);
    assert!(group_offline::get_cursor(&conn, &group_id, 1, &alice).expect("get").is_none());
    assert!(group_offline::get_cursor(&conn, &group_id, 1, &bob).expect("get").is_none());
    assert_eq!(group_offline::get_member_seq(&conn, &group_id, 1, &alice).expect("seq"), 0);
    assert!(
        group_key_history::get(&conn, &group_id, 1).is_err(),
        "epoch 1's key-history row must be gone after retirement"
    );

    // A second pass over the same epoch range is a no-op, not an error.
    let second_pass = retire_eligible_epochs(&dht, &conn, &mut cache, group_id, &creator_sign_pub, &roster, 2, grace_window_ms, 4000)
        .await
        .expect("retire again");
    assert!(second_pass.is_empty(), "an already-retired epoch has no key-history row left to retire again");
}
