//! # kiyeovo-errors
//!
//! The cross-crate error taxonomy (spec §7, component C10). Every lower
//! crate defines its own `thiserror`-scoped error enum; this crate is the
//! surface type callers actually match on, with the classification policy
//! (retryable? offline-fallback?) encoded as methods rather than prose so
//! C3's send path and C9's retry loops can call it programmatically.

use std::time::Duration;

/// The surface error enum, one variant per row of spec §7's table.
#[derive(Debug, thiserror::Error)]
pub enum KiyeovoError {
    /// GCM/Poly1305/ed25519 verification failed.
    #[error("authentication failed")]
    CryptoAuthFailed,

    /// A worker task (scrypt, RSA) exceeded its wall-clock budget.
    #[error("crypto operation timed out")]
    CryptoTimeout,

    /// Structural or peer-id mismatch after decrypting the identity vault.
    #[error("identity is corrupt: {0}")]
    CorruptIdentity(String),

    /// Dial failure, `ETIMEDOUT`, SOCKS error, or "no addresses" for a peer.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    /// Zero `PEER_RESPONSE` events during a DHT put.
    #[error("DHT put reached no peers")]
    DhtPutNoPeers,

    /// A compressed bucket store exceeds its configured size cap.
    #[error("store too large: {size} bytes exceeds cap of {cap} bytes")]
    StoreTooLarge { size: usize, cap: usize },

    /// A validator or update rule rejected a record as non-monotonic.
    #[error("stale record")]
    StaleRecord,

    /// A send was attempted while the session was mid-rotation.
    #[error("key rotation in progress")]
    RotationInProgress,

    /// Signature failure, id mismatch, or invalid DHT key path.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Key-exchange or file-offer throttled.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Timeout or external abort; no retry, no state mutation.
    #[error("cancelled")]
    Cancelled,

    /// A send timed out waiting for a direct reply.
    #[error("message timed out")]
    MessageTimeout,
}

impl KiyeovoError {
    /// Whether the caller should retry this operation (spec §7
    /// "Propagation policy").
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KiyeovoError::DhtPutNoPeers
                | KiyeovoError::StaleRecord
                | KiyeovoError::RotationInProgress
        )
    }

    /// Whether a failed direct send should fall back to the offline bucket
    /// path (spec §4.2 "Failure semantics": timeout and peer-unreachable
    /// map to offline fallback; all others surface to the caller).
    pub fn is_offline_fallback(&self) -> bool {
        matches!(
            self,
            KiyeovoError::PeerUnreachable(_) | KiyeovoError::MessageTimeout
        )
    }

    /// Whether this error should be logged and silently discarded at the
    /// protocol entry boundary rather than surfaced (spec §7: avoid
    /// amplifying malicious traffic).
    pub fn is_protocol_hygiene_drop(&self) -> bool {
        matches!(self, KiyeovoError::ProtocolViolation(_))
    }

    /// The backoff a retryable error suggests before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            KiyeovoError::DhtPutNoPeers => Some(Duration::from_secs(2)),
            KiyeovoError::StaleRecord => Some(Duration::from_millis(200)),
            KiyeovoError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

impl From<kiyeovo_crypto::CryptoError> for KiyeovoError {
    fn from(err: kiyeovo_crypto::CryptoError) -> Self {
        use kiyeovo_crypto::CryptoError;
        match err {
            CryptoError::SignatureVerification | CryptoError::AeadDecryption => {
                KiyeovoError::CryptoAuthFailed
            }
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, KiyeovoError>;
