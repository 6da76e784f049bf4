//! # kiyeovo-offline
//!
//! The direct offline bucket engine (spec §4.3, component C4): the
//! fallback path for a direct chat when the live session is unreachable.
//! A sender RSA-seals each message for the recipient and appends it to a
//! deterministically-addressed, signed DHT bucket; the recipient polls
//! that bucket, unseals new messages, and piggybacks read acknowledgements
//! on its own outgoing traffic.
//!
//! Does not dial peers or run the poll loop on a schedule — those belong
//! to `kiyeovo-transport` and `kiyeovo-scheduler` respectively. This crate
//! is the bucket key derivation, the wire format's put/poll algorithms,
//! and the local write-mirror.

pub mod bucket;
pub mod config;
pub mod mirror;
pub mod poll;
mod seal;
pub mod store;

pub use bucket::{construct_read_bucket_key, construct_write_bucket_key, read_key_path, write_key_path};
pub use config::OfflineConfig;
pub use mirror::BucketMirror;
pub use poll::{poll_bucket, PollOutcome};
pub use seal::{seal_content, unseal_content, SealedFields};
pub use store::{clear_acknowledged_messages, put, SenderInfo};

#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),

    #[error(transparent)]
    Db(#[from] kiyeovo_db::DbError),

    #[error(transparent)]
    Dht(#[from] kiyeovo_dht::DhtError),

    #[error(transparent)]
    Compression(#[from] kiyeovo_dht::compression::CompressionError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("store is full: {len} messages at cap {cap}")]
    StoreFull { len: usize, cap: usize },

    #[error("DHT put reached no peers")]
    NoPeerResponse,
}

impl From<OfflineError> for kiyeovo_errors::KiyeovoError {
    fn from(err: OfflineError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            OfflineError::NoPeerResponse => KiyeovoError::DhtPutNoPeers,
            OfflineError::Crypto(_) => KiyeovoError::CryptoAuthFailed,
            OfflineError::StoreFull { len, cap } => KiyeovoError::StoreTooLarge { size: len, cap },
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}
