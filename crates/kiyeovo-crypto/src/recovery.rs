//! BIP-39 recovery phrase generation and seed derivation (spec §3, §4.1).
//!
//! The identity vault's recovery copy is encrypted with a key derived from
//! the first 32 bytes of the BIP-39 seed, not from scrypt — a recovery
//! phrase has its own entropy budget, so stretching it further buys nothing.

use bip39::{Language, Mnemonic};

use crate::{CryptoError, Result};

/// Length in bytes of the password material taken from the BIP-39 seed.
pub const RECOVERY_KEY_LEN: usize = 32;

/// Generate a new random 24-word (256-bit entropy) recovery phrase.
pub fn generate_phrase() -> Result<Mnemonic> {
    let mut entropy = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut entropy);
    Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| CryptoError::Recovery(e.to_string()))
}

/// Parse and validate a recovery phrase entered by the user.
pub fn parse_phrase(phrase: &str) -> Result<Mnemonic> {
    Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| CryptoError::Recovery(e.to_string()))
}

/// Derive the 32-byte password material used to encrypt the recovery copy
/// of the identity vault: the first 32 bytes of the BIP-39 seed (no
/// passphrase).
pub fn seed_to_password_bytes(mnemonic: &Mnemonic) -> [u8; RECOVERY_KEY_LEN] {
    let seed = mnemonic.to_seed("");
    let mut out = [0u8; RECOVERY_KEY_LEN];
    out.copy_from_slice(&seed[..RECOVERY_KEY_LEN]);
    out
}
