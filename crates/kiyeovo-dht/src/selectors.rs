//! Replica tiebreak rules (spec §4.7's "Tiebreak" column): once several DHT
//! replicas have each passed their [`crate::validators::Validator`], these
//! comparators pick the one to trust.

use kiyeovo_types::groupinfo::GroupInfoLatest;
use kiyeovo_types::offline_direct::OfflineStore;
use kiyeovo_types::offline_group::GroupOfflineStore;

/// Version-monotone with `last_updated` as the tiebreak (direct offline,
/// group offline, and group-info-latest all share this rule).
pub trait VersionedRecord {
    fn version(&self) -> u64;
    fn last_updated(&self) -> u64;
}

impl VersionedRecord for OfflineStore {
    fn version(&self) -> u64 {
        self.version
    }
    fn last_updated(&self) -> u64 {
        self.last_updated
    }
}

impl VersionedRecord for GroupOfflineStore {
    fn version(&self) -> u64 {
        self.version
    }
    fn last_updated(&self) -> u64 {
        self.last_updated
    }
}

impl VersionedRecord for GroupInfoLatest {
    fn version(&self) -> u64 {
        self.latest_version
    }
    fn last_updated(&self) -> u64 {
        self.last_updated
    }
}

/// Pick the best of several already-validated replicas of the same
/// version-monotone record: highest `version`, `last_updated` as tiebreak.
pub fn select_best<T: VersionedRecord>(records: &[T]) -> Option<&T> {
    records.iter().max_by_key(|r| (r.version(), r.last_updated()))
}

/// `group-info-latest`'s extra rule: at equal `version`, two replicas must
/// carry an identical `latest_state_hash` or the higher-version ordering
/// cannot settle the conflict honestly. Returns `false` if any pair at the
/// max version disagrees, meaning the caller should treat the read as
/// inconclusive rather than silently pick one.
pub fn latest_version_is_consistent(records: &[GroupInfoLatest]) -> bool {
    let Some(max_version) = records.iter().map(|r| r.latest_version).max() else {
        return true;
    };
    let at_max: Vec<&GroupInfoLatest> = records
        .iter()
        .filter(|r| r.latest_version == max_version)
        .collect();
    at_max
        .windows(2)
        .all(|pair| pair[0].latest_state_hash == pair[1].latest_state_hash)
}

/// `group-info-v`'s rule: immutable once published, so any two records at
/// the same key path must be byte-identical; anything else is a validator
/// failure upstream, not a selector decision.
pub fn versioned_replicas_identical(encoded_replicas: &[Vec<u8>]) -> bool {
    encoded_replicas.windows(2).all(|pair| pair[0] == pair[1])
}
