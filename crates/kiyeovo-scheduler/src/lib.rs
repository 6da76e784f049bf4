//! # kiyeovo-scheduler
//!
//! Periodic background work (spec §5 narrative, component C9): polling
//! direct and group offline buckets, re-publishing outstanding pending
//! ACKs, retiring spent group epochs, and sweeping `SessionMap` for idle
//! eviction and rotation. Spec §4 has no dedicated subsection for this —
//! it is assembled from the narrative in §5 and the "background loops
//! never panic on a single item" policy in §7.
//!
//! A [`Scheduler`] owns a set of `tokio::time::interval`-driven loops,
//! each isolating per-item failures by logging and continuing, and all
//! shutting down cleanly on one broadcast signal.

pub mod config;
pub mod events;
pub mod group_offline;
pub mod offline;
pub mod pending_acks;
pub mod scheduler;
pub mod sessions;

pub use config::SchedulerConfig;
pub use events::{NullEvents, SchedulerEvents};
pub use scheduler::Scheduler;

/// The scheduler's own error surface: every sweep talks to several
/// lower-crate error types, so this just aggregates them the way every
/// other crate in the corpus aggregates its own dependencies' errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Db(#[from] kiyeovo_db::DbError),

    #[error(transparent)]
    Offline(#[from] kiyeovo_offline::OfflineError),

    #[error(transparent)]
    Group(#[from] kiyeovo_group::GroupError),

    #[error(transparent)]
    GroupOffline(#[from] kiyeovo_group_offline::GroupOfflineError),

    #[error(transparent)]
    GroupInfo(#[from] kiyeovo_groupinfo::GroupInfoError),

    #[error(transparent)]
    Identity(#[from] kiyeovo_identity::IdentityError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<SchedulerError> for kiyeovo_errors::KiyeovoError {
    fn from(err: SchedulerError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            SchedulerError::Offline(inner) => inner.into(),
            SchedulerError::Group(inner) => inner.into(),
            SchedulerError::GroupOffline(inner) => inner.into(),
            SchedulerError::GroupInfo(inner) => inner.into(),
            SchedulerError::Identity(inner) => inner.into(),
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}
