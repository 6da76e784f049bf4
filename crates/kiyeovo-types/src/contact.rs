//! The `User` (contact) entity (spec §3).

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::PeerId;

/// A known peer: a contact added via key exchange or via group welcome.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub peer_id: PeerId,
    pub username: String,
    #[serde_as(as = "serde_with::Bytes")]
    pub sign_pub: [u8; 32],
    pub offline_rsa_pub: Vec<u8>,
    /// Signature over the handshake that first introduced this contact, if
    /// the exchange happened over the wire rather than out-of-band.
    #[serde_as(as = "Option<serde_with::Bytes>")]
    pub handshake_sig: Option<[u8; 64]>,
    pub blocked: bool,
    pub added_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serde_roundtrip() {
        let user = User {
            peer_id: [0x01u8; 32],
            username: "alice".to_string(),
            sign_pub: [0x02u8; 32],
            offline_rsa_pub: vec![0x03u8; 8],
            handshake_sig: Some([0x04u8; 64]),
            blocked: false,
            added_at: 100,
        };
        let json = serde_json::to_string(&user).expect("serialize");
        let restored: User = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.peer_id, user.peer_id);
        assert_eq!(restored.handshake_sig, user.handshake_sig);
    }
}
