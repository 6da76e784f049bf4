//! XChaCha20-Poly1305 AEAD encryption (24-byte extended nonce).
//!
//! Used for direct session message encryption (spec §4.2) and group content
//! messages under the epoch key (spec §4.5), where every message needs a
//! fresh random nonce and the larger nonce space removes the need for a
//! counter or collision bookkeeping.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::{CryptoError, Result};

/// Nonce size for XChaCha20-Poly1305 (192 bits = 24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Key size for XChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Generate a fresh random 24-byte nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt data with XChaCha20-Poly1305.
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `nonce` - 24-byte nonce
/// * `plaintext` - Data to encrypt
/// * `aad` - Additional authenticated data (not encrypted, but authenticated)
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce);

    cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Decrypt data with XChaCha20-Poly1305.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Encrypt with a freshly generated nonce, returning `(nonce, ciphertext)`.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8], aad: &[u8]) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let nonce = generate_nonce();
    let ciphertext = encrypt(key, &nonce, plaintext, aad)?;
    Ok((nonce, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = generate_nonce();
        let plaintext = b"hello";
        let aad = b"sender|recv_fingerprint|7";

        let ciphertext = encrypt(&key, &nonce, plaintext, aad).expect("encrypt");
        let decrypted = decrypt(&key, &nonce, &ciphertext, aad).expect("decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_seal_produces_distinct_nonces() {
        let key = [0x11u8; KEY_SIZE];
        let (nonce1, _) = seal(&key, b"a", b"").expect("seal");
        let (nonce2, _) = seal(&key, b"a", b"").expect("seal");
        assert_ne!(nonce1, nonce2);
    }

    #[test]
    fn test_aad_mismatch_rejected() {
        let key = [0x11u8; KEY_SIZE];
        let (nonce, ciphertext) = seal(&key, b"message", b"aad-v1").expect("seal");
        assert!(decrypt(&key, &nonce, &ciphertext, b"aad-v2").is_err());
    }

    #[test]
    fn test_bit_flip_rejected() {
        let key = [0x22u8; KEY_SIZE];
        let (nonce, mut ciphertext) = seal(&key, b"message", b"aad").expect("seal");
        ciphertext[0] ^= 0x01;
        assert!(decrypt(&key, &nonce, &ciphertext, b"aad").is_err());
    }
}
