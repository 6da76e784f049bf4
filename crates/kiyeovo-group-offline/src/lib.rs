//! # kiyeovo-group-offline
//!
//! The group offline epoch bucket engine (spec §4.5, component C6): each
//! `(group, epoch, sender)` gets its own signed, rolling DHT bucket, so a
//! group member who was offline during a send can catch up once they
//! return, and a retired epoch's state is pruned once every member has
//! read past it.
//!
//! Reads roster membership and sender `seq` boundaries from
//! `kiyeovo-groupinfo` (C7); does not decide when to rotate keys or publish
//! a new group-info record — that belongs to `kiyeovo-group` (C5).

pub mod cache;
pub mod config;
pub mod crypt;
pub mod locks;
pub mod poll;
pub mod retire;
pub mod store;

pub use cache::BucketCache;
pub use config::GroupOfflineConfig;
pub use locks::BucketLockTable;
pub use poll::{poll_group, PollOutcome};
pub use retire::retire_eligible_epochs;
pub use store::put;

#[derive(Debug, thiserror::Error)]
pub enum GroupOfflineError {
    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),

    #[error(transparent)]
    Db(#[from] kiyeovo_db::DbError),

    #[error(transparent)]
    Dht(#[from] kiyeovo_dht::validators::DhtError),

    #[error(transparent)]
    Compression(#[from] kiyeovo_dht::compression::CompressionError),

    #[error(transparent)]
    GroupInfo(#[from] kiyeovo_groupinfo::GroupInfoError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("a compressed bucket store exceeds its configured size cap")]
    StoreTooLarge { size: usize, cap: usize },

    #[error("DHT put reached no peers")]
    NoPeerResponse,
}

impl From<GroupOfflineError> for kiyeovo_errors::KiyeovoError {
    fn from(err: GroupOfflineError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            GroupOfflineError::NoPeerResponse => KiyeovoError::DhtPutNoPeers,
            GroupOfflineError::Crypto(_) => KiyeovoError::CryptoAuthFailed,
            GroupOfflineError::StoreTooLarge { size, cap } => KiyeovoError::StoreTooLarge { size, cap },
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}
