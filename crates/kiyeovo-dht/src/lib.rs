//! # kiyeovo-dht
//!
//! The four Kiyeovo DHT namespaces (spec §6, component C8): key-path
//! construction and parsing, per-namespace write-authorisation validators,
//! and the replica-selection tiebreak rules. Does not talk to an actual
//! Kademlia network — that boundary is `kiyeovo-transport::DhtClient`.

pub mod compression;
pub mod keys;
pub mod selectors;
pub mod signing;
pub mod validators;

pub use keys::{
    direct_offline_key, group_info_latest_key, group_info_versioned_key, group_offline_key,
    KeyPathError,
};
pub use validators::{validator_for, DhtError, Validator};
