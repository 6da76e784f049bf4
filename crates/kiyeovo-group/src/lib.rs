//! # kiyeovo-group
//!
//! The group control plane (spec §4.4, component C5): creating a group,
//! fanning out invites, handling the invitee's accept/reject, the
//! creator's welcome/rotation response, the joiner's welcome handling, and
//! control-ACK matching against *Pending ACK*. Every control message rides
//! the pair's direct offline bucket (`kiyeovo-offline`, C4); key rotation's
//! last step hands the new roster to `kiyeovo-groupinfo` (C7) to publish.
//!
//! Does not poll buckets or run the re-publisher on a timer — that is
//! `kiyeovo-scheduler`'s job. This crate is the state machine and the wire
//! handlers it drives.

pub mod ack;
pub mod config;
pub mod creator;
pub mod dispatch;
pub mod invitee;
pub mod joiner;
pub mod lifecycle;
pub mod rotation;
pub mod send;

pub use config::GroupConfig;
pub use dispatch::{dispatch, GroupEvent};
pub use lifecycle::create_group;

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),

    #[error(transparent)]
    Db(#[from] kiyeovo_db::DbError),

    #[error(transparent)]
    Identity(#[from] kiyeovo_identity::IdentityError),

    #[error(transparent)]
    Offline(#[from] kiyeovo_offline::OfflineError),

    #[error(transparent)]
    GroupInfo(#[from] kiyeovo_groupinfo::GroupInfoError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("no direct chat with peer {0:?}")]
    NoDirectChat(kiyeovo_types::PeerId),

    #[error("invite already lapsed")]
    InviteExpired,

    #[error("invite id mismatch")]
    InviteIdMismatch,

    #[error("unrelated peer attempted a creator-only action")]
    NotCreator,

    #[error("signature verification failed")]
    BadSignature,

    #[error("group would exceed the member cap")]
    TooManyMembers,

    #[error("a group needs at least two invitees")]
    TooFewMembers,

    #[error("decrypted group key had the wrong length")]
    MalformedGroupKey,

    #[error("no group-info record found for the announced epoch")]
    GroupInfoMissing,
}

impl From<GroupError> for kiyeovo_errors::KiyeovoError {
    fn from(err: GroupError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            GroupError::Crypto(_) | GroupError::BadSignature => KiyeovoError::CryptoAuthFailed,
            GroupError::InviteExpired => KiyeovoError::ProtocolViolation("invite expired".into()),
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}
