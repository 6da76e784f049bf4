//! RSA-3072 OAEP sealing for offline message envelopes (spec §3, §4.3).
//!
//! Direct-message offline buckets RSA-encrypt the sender-info block and,
//! depending on plaintext size, either RSA-encrypt the content directly or
//! wrap a random AES-256-GCM key and RSA-encrypt that instead (`hybrid`).

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key as AesKey, Nonce as AesNonce};
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};

use crate::{CryptoError, Result};

/// RSA modulus size used for identity offline/notification keypairs.
pub const KEY_BITS: usize = 3072;

/// Maximum plaintext length that fits directly under RSA-3072-OAEP-SHA256
/// (`modulus_bytes - 2*hash_len - 2`).
pub const MAX_OAEP_PLAINTEXT_3072: usize = 384 - 2 * 32 - 2;

/// AES-256-GCM key size used for the hybrid path.
pub const AES_KEY_SIZE: usize = 32;
/// AES-256-GCM IV size used for the hybrid path.
pub const AES_IV_SIZE: usize = 12;
/// AES-256-GCM authentication tag size, prepended to hybrid ciphertext.
pub const AES_TAG_SIZE: usize = 16;

/// An RSA keypair.
pub struct RsaKeyPair {
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generate a new RSA-3072 keypair.
    pub fn generate() -> Result<Self> {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| CryptoError::Rsa(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            private_key,
            public_key,
        })
    }
}

/// Encrypt `plaintext` directly under RSA-OAEP (SHA-256).
///
/// Caller is responsible for checking `plaintext.len() <= MAX_OAEP_PLAINTEXT_3072`
/// before calling — see [`seal`] for the size-aware entry point.
pub fn oaep_encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut rng = rand::rngs::OsRng;
    let padding = Oaep::new::<sha2::Sha256>();
    public_key
        .encrypt(&mut rng, padding, plaintext)
        .map_err(|e| CryptoError::Rsa(e.to_string()))
}

/// Decrypt an RSA-OAEP (SHA-256) ciphertext.
pub fn oaep_decrypt(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let padding = Oaep::new::<sha2::Sha256>();
    private_key
        .decrypt(padding, ciphertext)
        .map_err(|e| CryptoError::Rsa(e.to_string()))
}

/// The sealed form of an offline message's content field.
pub enum Sealed {
    /// Content fit directly under the RSA plaintext bound.
    Encrypted { ciphertext: Vec<u8> },
    /// Content was AES-256-GCM-encrypted; the AES key is RSA-wrapped.
    Hybrid {
        encrypted_aes_key: Vec<u8>,
        aes_iv: [u8; AES_IV_SIZE],
        ciphertext: Vec<u8>,
    },
}

/// Seal `plaintext` for a recipient, choosing the direct or hybrid path per
/// spec §4.3's size rule.
pub fn seal(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Sealed> {
    if plaintext.len() <= MAX_OAEP_PLAINTEXT_3072 {
        let ciphertext = oaep_encrypt(public_key, plaintext)?;
        return Ok(Sealed::Encrypted { ciphertext });
    }

    let mut aes_key = [0u8; AES_KEY_SIZE];
    let mut aes_iv = [0u8; AES_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut aes_key);
    rand::rngs::OsRng.fill_bytes(&mut aes_iv);

    let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&aes_key));
    let ciphertext = cipher
        .encrypt(
            AesNonce::from_slice(&aes_iv),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)?;

    let encrypted_aes_key = oaep_encrypt(public_key, &aes_key)?;

    Ok(Sealed::Hybrid {
        encrypted_aes_key,
        aes_iv,
        ciphertext,
    })
}

/// Unseal a [`Sealed`] content field.
pub fn unseal(private_key: &RsaPrivateKey, sealed: &Sealed) -> Result<Vec<u8>> {
    match sealed {
        Sealed::Encrypted { ciphertext } => oaep_decrypt(private_key, ciphertext),
        Sealed::Hybrid {
            encrypted_aes_key,
            aes_iv,
            ciphertext,
        } => {
            let aes_key_bytes = oaep_decrypt(private_key, encrypted_aes_key)?;
            if aes_key_bytes.len() != AES_KEY_SIZE {
                return Err(CryptoError::InvalidKeyLength {
                    expected: AES_KEY_SIZE,
                    actual: aes_key_bytes.len(),
                });
            }
            let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&aes_key_bytes));
            cipher
                .decrypt(
                    AesNonce::from_slice(aes_iv),
                    Payload {
                        msg: ciphertext,
                        aad: &[],
                    },
                )
                .map_err(|_| CryptoError::AeadDecryption)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oaep_roundtrip() {
        let kp = RsaKeyPair::generate().expect("keygen");
        let ciphertext = oaep_encrypt(&kp.public_key, b"short message").expect("encrypt");
        let plaintext = oaep_decrypt(&kp.private_key, &ciphertext).expect("decrypt");
        assert_eq!(plaintext, b"short message");
    }

    #[test]
    fn test_seal_small_uses_direct_path() {
        let kp = RsaKeyPair::generate().expect("keygen");
        let sealed = seal(&kp.public_key, b"hello").expect("seal");
        assert!(matches!(sealed, Sealed::Encrypted { .. }));
        let plaintext = unseal(&kp.private_key, &sealed).expect("unseal");
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_seal_large_uses_hybrid_path() {
        let kp = RsaKeyPair::generate().expect("keygen");
        let big = vec![0x42u8; MAX_OAEP_PLAINTEXT_3072 + 1];
        let sealed = seal(&kp.public_key, &big).expect("seal");
        assert!(matches!(sealed, Sealed::Hybrid { .. }));
        let plaintext = unseal(&kp.private_key, &sealed).expect("unseal");
        assert_eq!(plaintext, big);
    }

    #[test]
    fn test_unseal_wrong_key_fails() {
        let kp1 = RsaKeyPair::generate().expect("keygen");
        let kp2 = RsaKeyPair::generate().expect("keygen");
        let sealed = seal(&kp1.public_key, b"secret").expect("seal");
        assert!(unseal(&kp2.private_key, &sealed).is_err());
    }
}
