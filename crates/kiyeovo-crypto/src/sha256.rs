//! SHA-256, used only for the group-info versioned-record state hash chain
//! (spec §4.6). Every other hash in this crate is BLAKE3 — this one spot is
//! pinned to SHA-256 because the spec names it explicitly.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data`.
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector_empty_string() {
        let digest = hash(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hash(b"chain"), hash(b"chain"));
    }

    #[test]
    fn test_different_inputs_differ() {
        assert_ne!(hash(b"v1"), hash(b"v2"));
    }
}
