//! # kiyeovo-groupinfo
//!
//! Group Info DHT records (spec §4.6, component C7): the creator-signed
//! "latest pointer" and the immutable, hash-chained "versioned record" that
//! `kiyeovo-group-offline` (C6) reads to learn a group's roster and retired
//! epoch boundaries.
//!
//! Does not decide *when* to publish a new version — `kiyeovo-group` calls
//! [`publish::publish`] as the last step of accepting a member or rotating
//! a key (spec §4.4: "Finally publish C7's group-info records").

pub mod boundaries;
pub mod build;
pub mod fetch;
pub mod publish;

pub use boundaries::compute_sender_seq_boundaries;
pub use build::{build_latest_record, build_versioned_record};
pub use fetch::{fetch_latest, fetch_versioned};
pub use publish::publish;

#[derive(Debug, thiserror::Error)]
pub enum GroupInfoError {
    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),

    #[error(transparent)]
    Db(#[from] kiyeovo_db::DbError),

    #[error(transparent)]
    Dht(#[from] kiyeovo_dht::validators::DhtError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("DHT put reached no peers")]
    NoPeerResponse,

    #[error("group-info-latest replicas at the same version disagree")]
    LatestReplicasDisagree,

    #[error("group-info-v replicas at the same version are not byte-identical")]
    VersionedReplicasDisagree,
}

impl From<GroupInfoError> for kiyeovo_errors::KiyeovoError {
    fn from(err: GroupInfoError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            GroupInfoError::NoPeerResponse => KiyeovoError::DhtPutNoPeers,
            GroupInfoError::Crypto(_) => KiyeovoError::CryptoAuthFailed,
            GroupInfoError::LatestReplicasDisagree | GroupInfoError::VersionedReplicasDisagree => {
                KiyeovoError::StaleRecord
            }
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}
