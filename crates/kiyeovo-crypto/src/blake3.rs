//! Domain-separated BLAKE3 hashing for the Kiyeovo protocol.
//!
//! BLAKE3 serves several distinct purposes in Kiyeovo — deriving bucket keys
//! from a shared secret, expanding session key material, and deriving
//! recovery-vault keys. Cross-domain collisions are prevented by mandatory
//! domain separation using BLAKE3's built-in key-derivation mode.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: record keys, content hashes
//! - [`derive_key`] — Key derivation: session keys, bucket keys, vault keys
//! - [`keyed_hash`] — Keyed MAC/PRF

/// Registered BLAKE3 context strings. Using an unregistered context string
/// anywhere in the codebase is a protocol violation.
pub mod contexts {
    pub const OFFLINE_BUCKET_SECRET: &str = "Kiyeovo v1 offline-bucket-secret";
    pub const OFFLINE_WRITE_BUCKET_KEY: &str = "Kiyeovo v1 offline-write-bucket-key";
    pub const OFFLINE_READ_BUCKET_KEY: &str = "Kiyeovo v1 offline-read-bucket-key";
    pub const SESSION_SEND_KEY: &str = "Kiyeovo v1 session-send-key";
    pub const SESSION_RECV_KEY: &str = "Kiyeovo v1 session-recv-key";
    pub const GROUP_OFFLINE_BUCKET_KEY: &str = "Kiyeovo v1 group-offline-bucket-key";
    pub const RECOVERY_VAULT_KEY: &str = "Kiyeovo v1 recovery-vault-key";
    pub const PENDING_ACK_KEY: &str = "Kiyeovo v1 pending-ack-key";

    /// All registered context strings, used for validation in tests.
    pub const ALL_CONTEXTS: &[&str] = &[
        OFFLINE_BUCKET_SECRET,
        OFFLINE_WRITE_BUCKET_KEY,
        OFFLINE_READ_BUCKET_KEY,
        SESSION_SEND_KEY,
        SESSION_RECV_KEY,
        GROUP_OFFLINE_BUCKET_KEY,
        RECOVERY_VAULT_KEY,
        PENDING_ACK_KEY,
    ];
}

/// Compute the BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Compute a variable-length BLAKE3 hash.
pub fn hash_xof(data: &[u8], output: &mut [u8]) {
    let mut hasher = ::blake3::Hasher::new();
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    reader.fill(output);
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// `context` must be one of the registered context strings above. The key
/// material can be any byte slice (a shared secret, another derived key, ...).
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
///
/// `key` must be exactly 32 bytes, typically obtained via [`derive_key`].
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_context_strings_registered() {
        for ctx in contexts::ALL_CONTEXTS {
            assert!(
                ctx.starts_with("Kiyeovo v1 "),
                "Context string '{ctx}' has wrong prefix"
            );
        }
    }

    #[test]
    fn test_hash_deterministic() {
        let result1 = hash(b"Kiyeovo test vector 1");
        let result2 = hash(b"Kiyeovo test vector 1");
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_hash_different_inputs() {
        assert_ne!(hash(b"input1"), hash(b"input2"));
    }

    #[test]
    fn test_derive_key_deterministic() {
        let key1 = derive_key(contexts::OFFLINE_BUCKET_SECRET, &[0u8; 32]);
        let key2 = derive_key(contexts::OFFLINE_BUCKET_SECRET, &[0u8; 32]);
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_derive_key_different_contexts() {
        let key1 = derive_key(contexts::SESSION_SEND_KEY, &[0u8; 32]);
        let key2 = derive_key(contexts::SESSION_RECV_KEY, &[0u8; 32]);
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_keyed_hash_deterministic() {
        let key = derive_key(contexts::PENDING_ACK_KEY, b"");
        let mac1 = keyed_hash(&key, &[0u8; 64]);
        let mac2 = keyed_hash(&key, &[0u8; 64]);
        assert_eq!(mac1, mac2);
    }

    #[test]
    fn test_multi_field_encoding() {
        let encoded = encode_multi_field(&[b"hello", b"world"]);
        assert_eq!(encoded.len(), 4 + 5 + 4 + 5);
        assert_eq!(&encoded[0..4], &5u32.to_le_bytes());
        assert_eq!(&encoded[4..9], b"hello");
        assert_eq!(&encoded[9..13], &5u32.to_le_bytes());
        assert_eq!(&encoded[13..18], b"world");
    }

    #[test]
    fn test_is_registered_context() {
        assert!(is_registered_context("Kiyeovo v1 session-send-key"));
        assert!(!is_registered_context("Kiyeovo v1 made-up-context"));
    }

    #[test]
    fn test_xof_output() {
        let mut output64 = [0u8; 64];
        hash_xof(b"test", &mut output64);
        let standard = hash(b"test");
        assert_eq!(&output64[..32], &standard);
    }
}
