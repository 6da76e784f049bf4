//! The long-term identity record (spec §3).

use serde::{Deserialize, Serialize};

use crate::PeerId;

/// The plaintext identity, as it exists only in process memory between
/// unlock and the next zeroization. Persisted only in encrypted form — see
/// `kiyeovo-identity` for the at-rest envelope.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Content hash of the libp2p public key.
    pub id: PeerId,
    /// libp2p (peer) Ed25519 private key, raw bytes.
    pub libp2p_priv: [u8; 32],
    /// Application-level signing private key, raw bytes.
    pub sign_priv: [u8; 32],
    /// Application-level signing public key, raw bytes.
    pub sign_pub: [u8; 32],
    /// RSA-3072 private key (PKCS#8 DER) used to seal offline messages.
    pub offline_rsa_priv: Vec<u8>,
    /// RSA-3072 public key (DER) used to seal offline messages to us.
    pub offline_rsa_pub: Vec<u8>,
    /// RSA-3072 private key (PKCS#8 DER) used for notification payloads.
    pub notif_rsa_priv: Vec<u8>,
    /// RSA-3072 public key (DER) used for notification payloads.
    pub notif_rsa_pub: Vec<u8>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &hex::encode(self.id))
            .finish_non_exhaustive()
    }
}

/// The at-rest envelope for an identity, as stored in the `identity` table.
/// One row for the password-derived copy, one for the recovery-phrase copy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityEnvelope {
    pub peer_id: PeerId,
    pub salt: [u8; 32],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
    pub created_at: EpochSeconds,
}

pub type EpochSeconds = u64;
