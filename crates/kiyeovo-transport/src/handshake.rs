//! Direct-session key exchange (spec §4.2).
//!
//! Initiator I sends a signed [`KeyExchangeInit`]; responder R verifies it,
//! installs a session, and answers with a signed [`KeyExchangeResponse`]; I
//! installs the mirror session. Both sides derive identical `sending_key`/
//! `receiving_key` pairs (invariant I6) and a shared `offline_bucket_secret`,
//! without ever agreeing out-of-band on who is "first" — key assignment is
//! ordered by comparing the two ephemeral public keys.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error;

use kiyeovo_crypto::blake3::{self, contexts};
use kiyeovo_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use kiyeovo_crypto::x25519::{X25519PublicKey, X25519StaticSecret};
use kiyeovo_session::Session;
use kiyeovo_types::PeerId;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("key exchange message is too old ({age_secs}s, max {max_secs}s)")]
    Expired { age_secs: u64, max_secs: u64 },

    #[error("key exchange signature invalid")]
    BadSignature,

    #[error("key exchange is addressed to the wrong peer")]
    WrongRecipient,

    #[error("initiator is blocked")]
    Blocked,

    #[error("key exchange rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),
}

impl From<HandshakeError> for kiyeovo_errors::KiyeovoError {
    fn from(err: HandshakeError) -> Self {
        use kiyeovo_errors::KiyeovoError;
        match err {
            HandshakeError::RateLimited { retry_after_secs } => KiyeovoError::RateLimited { retry_after_secs },
            HandshakeError::BadSignature | HandshakeError::Blocked => KiyeovoError::CryptoAuthFailed,
            other => KiyeovoError::ProtocolViolation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, HandshakeError>;

/// Sent by the initiator over the chat protocol stream.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyExchangeInit {
    pub kx_id: String,
    pub initiator_peer_id: PeerId,
    #[serde_as(as = "serde_with::Bytes")]
    pub initiator_sign_pub: [u8; 32],
    #[serde_as(as = "serde_with::Bytes")]
    pub initiator_eph_pub: [u8; 32],
    pub responder_peer_id: PeerId,
    pub timestamp: u64,
    pub greeting: Option<String>,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

/// Sent by the responder once it accepts the exchange.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyExchangeResponse {
    pub kx_id: String,
    pub responder_peer_id: PeerId,
    #[serde_as(as = "serde_with::Bytes")]
    pub responder_sign_pub: [u8; 32],
    #[serde_as(as = "serde_with::Bytes")]
    pub responder_eph_pub: [u8; 32],
    pub timestamp: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

fn init_signed_fields(
    kx_id: &str,
    initiator_eph_pub: &[u8; 32],
    responder_peer_id: &PeerId,
    timestamp: u64,
    greeting: Option<&str>,
) -> Vec<u8> {
    blake3::encode_multi_field(&[
        kx_id.as_bytes(),
        initiator_eph_pub,
        responder_peer_id,
        &timestamp.to_be_bytes(),
        greeting.unwrap_or("").as_bytes(),
    ])
}

fn response_signed_fields(
    kx_id: &str,
    responder_eph_pub: &[u8; 32],
    initiator_peer_id: &PeerId,
    timestamp: u64,
) -> Vec<u8> {
    blake3::encode_multi_field(&[
        kx_id.as_bytes(),
        responder_eph_pub,
        initiator_peer_id,
        &timestamp.to_be_bytes(),
    ])
}

/// Build and sign a [`KeyExchangeInit`]. Returns the message to send and the
/// ephemeral secret the caller must hold onto until the response arrives.
pub fn build_init(
    kx_id: String,
    initiator_peer_id: PeerId,
    initiator_signing_key: &SigningKey,
    responder_peer_id: PeerId,
    greeting: Option<String>,
    now: u64,
) -> (KeyExchangeInit, X25519StaticSecret) {
    let ephemeral = X25519StaticSecret::random();
    let eph_pub = ephemeral.public_key().to_bytes();

    let signed = init_signed_fields(&kx_id, &eph_pub, &responder_peer_id, now, greeting.as_deref());
    let signature = initiator_signing_key.sign(&signed).to_bytes();

    let msg = KeyExchangeInit {
        kx_id,
        initiator_peer_id,
        initiator_sign_pub: initiator_signing_key.verifying_key().to_bytes(),
        initiator_eph_pub: eph_pub,
        responder_peer_id,
        timestamp: now,
        greeting,
        signature,
    };
    (msg, ephemeral)
}

/// Verify a received [`KeyExchangeInit`]: signature, recipient, and freshness.
/// Does not check contact/block/rate-limit policy — that is the caller's
/// responsibility (spec §4.2 step 2).
pub fn verify_init(
    msg: &KeyExchangeInit,
    our_peer_id: &PeerId,
    now: u64,
    max_age_secs: u64,
) -> Result<()> {
    if &msg.responder_peer_id != our_peer_id {
        return Err(HandshakeError::WrongRecipient);
    }

    let age = now.saturating_sub(msg.timestamp);
    if age > max_age_secs {
        return Err(HandshakeError::Expired {
            age_secs: age,
            max_secs: max_age_secs,
        });
    }

    let signed = init_signed_fields(
        &msg.kx_id,
        &msg.initiator_eph_pub,
        &msg.responder_peer_id,
        msg.timestamp,
        msg.greeting.as_deref(),
    );
    let vk = VerifyingKey::from_bytes(&msg.initiator_sign_pub)?;
    let sig = Signature::from_bytes(&msg.signature);
    vk.verify(&signed, &sig).map_err(|_| HandshakeError::BadSignature)?;

    Ok(())
}

/// Accept an already-verified init: generate our ephemeral pair, derive the
/// session, and build the signed response.
pub fn build_response(
    msg: &KeyExchangeInit,
    responder_signing_key: &SigningKey,
    now: u64,
) -> (KeyExchangeResponse, Session, [u8; 32]) {
    let ephemeral = X25519StaticSecret::random();
    let our_eph_pub = ephemeral.public_key();
    let their_eph_pub = X25519PublicKey::from_bytes(msg.initiator_eph_pub);
    let shared = ephemeral.diffie_hellman(&their_eph_pub);

    let (sending_key, receiving_key) =
        session_keys(our_eph_pub.as_bytes(), &msg.initiator_eph_pub, shared.as_bytes());
    let bucket_secret = blake3::derive_key(contexts::OFFLINE_BUCKET_SECRET, shared.as_bytes());

    let session = Session {
        peer_id: msg.initiator_peer_id,
        sending_key,
        receiving_key,
        ephemeral_priv: ephemeral.to_bytes(),
        message_count: 0,
        last_used: now,
        created_at: now,
    };

    let signed = response_signed_fields(
        &msg.kx_id,
        our_eph_pub.as_bytes(),
        &msg.initiator_peer_id,
        now,
    );
    let signature = responder_signing_key.sign(&signed).to_bytes();

    let response = KeyExchangeResponse {
        kx_id: msg.kx_id.clone(),
        responder_peer_id: msg.responder_peer_id,
        responder_sign_pub: responder_signing_key.verifying_key().to_bytes(),
        responder_eph_pub: *our_eph_pub.as_bytes(),
        timestamp: now,
        signature,
    };

    (response, session, bucket_secret)
}

/// Verify a [`KeyExchangeResponse`] and install the mirror session on the
/// initiator's side.
pub fn accept_response(
    msg: &KeyExchangeResponse,
    initiator_peer_id: &PeerId,
    our_ephemeral: X25519StaticSecret,
    now: u64,
    max_age_secs: u64,
) -> Result<(Session, [u8; 32])> {
    let age = now.saturating_sub(msg.timestamp);
    if age > max_age_secs {
        return Err(HandshakeError::Expired {
            age_secs: age,
            max_secs: max_age_secs,
        });
    }

    let signed = response_signed_fields(
        &msg.kx_id,
        &msg.responder_eph_pub,
        initiator_peer_id,
        msg.timestamp,
    );
    let vk = VerifyingKey::from_bytes(&msg.responder_sign_pub)?;
    let sig = Signature::from_bytes(&msg.signature);
    vk.verify(&signed, &sig).map_err(|_| HandshakeError::BadSignature)?;

    let our_eph_pub = our_ephemeral.public_key();
    let their_eph_pub = X25519PublicKey::from_bytes(msg.responder_eph_pub);
    let shared = our_ephemeral.diffie_hellman(&their_eph_pub);

    let (sending_key, receiving_key) =
        session_keys(our_eph_pub.as_bytes(), &msg.responder_eph_pub, shared.as_bytes());
    let bucket_secret = blake3::derive_key(contexts::OFFLINE_BUCKET_SECRET, shared.as_bytes());

    let session = Session {
        peer_id: msg.responder_peer_id,
        sending_key,
        receiving_key,
        ephemeral_priv: our_ephemeral.to_bytes(),
        message_count: 0,
        last_used: now,
        created_at: now,
    };

    Ok((session, bucket_secret))
}

/// Derive the mirrored `(sending_key, receiving_key)` pair for one side of
/// the exchange. The two ephemeral public keys are sorted so both sides
/// compute the same two keys and assign them symmetrically: the side whose
/// own key sorts first sends with `key_lo`, the other sends with `key_hi`.
fn session_keys(my_eph_pub: &[u8; 32], their_eph_pub: &[u8; 32], shared: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    let (lo, hi) = if my_eph_pub <= their_eph_pub {
        (my_eph_pub, their_eph_pub)
    } else {
        (their_eph_pub, my_eph_pub)
    };
    let material = blake3::encode_multi_field(&[shared, lo, hi]);
    let key_lo = blake3::derive_key(contexts::SESSION_SEND_KEY, &material);
    let key_hi = blake3::derive_key(contexts::SESSION_RECV_KEY, &material);

    if my_eph_pub <= their_eph_pub {
        (key_lo, key_hi)
    } else {
        (key_hi, key_lo)
    }
}
