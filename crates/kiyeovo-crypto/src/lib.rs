//! # kiyeovo-crypto
//!
//! Cryptographic primitives for the Kiyeovo protocol.
//!
//! This crate implements every cryptographic operation the messaging engine
//! needs. No algorithm negotiation is permitted — the suite is fixed.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing and key derivation
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032)
//! - [`x25519`] — X25519 key agreement (RFC 7748)
//! - [`chacha20`] — ChaCha20-Poly1305 AEAD encryption (RFC 8439)
//! - [`xchacha20`] — XChaCha20-Poly1305 AEAD encryption (24-byte nonce)
//! - [`aesgcm`] — AES-256-GCM AEAD encryption, used only by the identity vault
//! - [`scrypt`] — Password-based key derivation for the identity vault
//! - [`rsa`] — RSA-OAEP sealing for offline message envelopes
//! - [`recovery`] — BIP-39 recovery phrase generation and seed derivation
//! - [`sha256`] — SHA-256, used only for the group-info state hash chain

pub mod aesgcm;
pub mod blake3;
pub mod chacha20;
pub mod ed25519;
pub mod recovery;
pub mod rsa;
pub mod scrypt;
pub mod sha256;
pub mod x25519;
pub mod xchacha20;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// scrypt key derivation failed.
    #[error("scrypt error: {0}")]
    Scrypt(String),

    /// RSA encryption or decryption failed.
    #[error("rsa error: {0}")]
    Rsa(String),

    /// BIP-39 recovery phrase error.
    #[error("recovery phrase error: {0}")]
    Recovery(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
