//! Direct-message AEAD (spec §4.2): XChaCha20-Poly1305 with
//! `AAD = {sender_peer_id, recv_pub_fingerprint, msg_counter}`.

use thiserror::Error;

use kiyeovo_crypto::{blake3, xchacha20};
use kiyeovo_types::session::Session;
use kiyeovo_types::PeerId;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error(transparent)]
    Crypto(#[from] kiyeovo_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, MessageError>;

/// An encrypted direct message on the wire: the nonce and counter travel
/// alongside the ciphertext so the receiver can rebuild the AAD.
#[derive(Debug, Clone)]
pub struct EncryptedMessage {
    pub nonce: [u8; xchacha20::NONCE_SIZE],
    pub counter: u64,
    pub ciphertext: Vec<u8>,
}

fn build_aad(sender_peer_id: &PeerId, recv_pub_fingerprint: &[u8; 32], counter: u64) -> Vec<u8> {
    let mut aad = Vec::with_capacity(32 + 32 + 8);
    aad.extend_from_slice(sender_peer_id);
    aad.extend_from_slice(recv_pub_fingerprint);
    aad.extend_from_slice(&counter.to_be_bytes());
    aad
}

/// Encrypt `plaintext` for the peer on the other end of `session`, using
/// and then advancing the session's send counter. `sender_peer_id` is our
/// own id (the AAD binds the sender, not the recipient).
pub fn encrypt(
    session: &mut Session,
    sender_peer_id: &PeerId,
    now: u64,
    plaintext: &[u8],
) -> Result<EncryptedMessage> {
    let nonce = xchacha20::generate_nonce();
    let counter = session.message_count;
    // By invariant I6 (session key symmetry), the peer's receiving_key
    // equals our sending_key — fingerprinting our own sending_key here
    // lets the receiver reconstruct the same AAD from their receiving_key.
    let fingerprint = blake3::hash(&session.sending_key);
    let aad = build_aad(sender_peer_id, &fingerprint, counter);

    let ciphertext = xchacha20::encrypt(&session.sending_key, &nonce, plaintext, &aad)?;

    session.message_count += 1;
    session.last_used = now;

    Ok(EncryptedMessage {
        nonce,
        counter,
        ciphertext,
    })
}

/// Decrypt a message received from `sender_peer_id` over `session`,
/// rejecting any AEAD tag mismatch (wrong counter, tampered ciphertext, or
/// the wrong session).
pub fn decrypt(
    session: &mut Session,
    sender_peer_id: &PeerId,
    now: u64,
    msg: &EncryptedMessage,
) -> Result<Vec<u8>> {
    let fingerprint = blake3::hash(&session.receiving_key);
    let aad = build_aad(sender_peer_id, &fingerprint, msg.counter);

    let plaintext = xchacha20::decrypt(&session.receiving_key, &msg.nonce, &msg.ciphertext, &aad)?;

    session.message_count += 1;
    session.last_used = now;

    Ok(plaintext)
}
