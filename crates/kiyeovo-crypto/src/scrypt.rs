//! scrypt password-based key derivation.
//!
//! Used to derive the identity vault's at-rest encryption key (spec §3, §4.1):
//! `K = scrypt(password, salt, {N, r=8, p=1, dkLen=32})`.

use scrypt::Params;

use crate::{CryptoError, Result};

/// r (block size) parameter, fixed per spec.
pub const R_COST: u32 = 8;
/// p (parallelism) parameter, fixed per spec.
pub const P_COST: u32 = 1;
/// Output key length in bytes, fixed per spec.
pub const OUTPUT_LEN: usize = 32;
/// Salt length in bytes, fixed per spec.
pub const SALT_LEN: usize = 32;

/// Derive a 32-byte key from a password using scrypt.
///
/// `n` is the scrypt cost parameter expressed as `log2(N)` — the `scrypt`
/// crate's [`Params`] takes the log rather than `N` itself, so callers
/// supplying a configured `N` (e.g. `IDENTITY_SCRYPT_N`) must pass its log2.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN], log_n: u8) -> Result<[u8; OUTPUT_LEN]> {
    let params = Params::new(log_n, R_COST, P_COST, OUTPUT_LEN)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut output = [0u8; OUTPUT_LEN];
    scrypt::scrypt(password, salt, &params, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(output)
}

/// Generate a random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
    salt
}
