//! # kiyeovo-identity
//!
//! The identity vault (spec §3, §4.1, component C1): creates the long-term
//! identity, encrypts it at rest under a password or a BIP-39 recovery
//! phrase, and unlocks it on demand.
//!
//! Key derivation and decryption run on a blocking worker under a
//! configurable timeout, so a misbehaving scrypt cost parameter cannot
//! stall the async runtime (spec §4.1, §5).

mod policy;
mod vault;

pub use policy::{validate as validate_password, PolicyError, MIN_LENGTH};
pub use vault::{
    decode_rsa_private, decode_rsa_public, generate_identity, sign, verify, IdentityError, Result,
    UnlockConfig, Vault,
};
