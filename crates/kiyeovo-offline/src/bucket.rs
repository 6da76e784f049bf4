//! Direct offline bucket-key derivation (spec §4.3: "the sender's write
//! bucket and the peer's read bucket are distinct keys; both parties
//! compute them deterministically from the shared `bucket_secret` and the
//! respective public key").
//!
//! `Chat.offline_bucket_secret` is identical on both sides of a session
//! (derived once from the ECDH shared secret during the key exchange). To
//! turn that single symmetric value into two distinct per-direction
//! secrets without either side knowing in advance which one "goes first",
//! this mirrors `kiyeovo_transport::handshake`'s `session_keys` trick:
//! the two signing public keys are sorted, and the lower one's writer
//! always gets `key_lo`.

use kiyeovo_crypto::blake3::{contexts, derive_key, encode_multi_field};
use kiyeovo_dht::keys::direct_offline_key;

fn derive_pair(bucket_secret: &[u8; 32], own_sign_pub: &[u8; 32], peer_sign_pub: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    let (lo, hi) = if own_sign_pub <= peer_sign_pub {
        (own_sign_pub, peer_sign_pub)
    } else {
        (peer_sign_pub, own_sign_pub)
    };
    let material = encode_multi_field(&[bucket_secret, lo, hi]);
    let key_lo = derive_key(contexts::OFFLINE_WRITE_BUCKET_KEY, &material);
    let key_hi = derive_key(contexts::OFFLINE_READ_BUCKET_KEY, &material);
    (key_lo, key_hi)
}

/// The bucket-secret segment used to address our own outgoing store.
pub fn construct_write_bucket_key(
    bucket_secret: &[u8; 32],
    own_sign_pub: &[u8; 32],
    peer_sign_pub: &[u8; 32],
) -> [u8; 32] {
    let (key_lo, key_hi) = derive_pair(bucket_secret, own_sign_pub, peer_sign_pub);
    if own_sign_pub <= peer_sign_pub {
        key_lo
    } else {
        key_hi
    }
}

/// The bucket-secret segment used to address the peer's outgoing store
/// (what we poll to receive their messages).
pub fn construct_read_bucket_key(
    bucket_secret: &[u8; 32],
    own_sign_pub: &[u8; 32],
    peer_sign_pub: &[u8; 32],
) -> [u8; 32] {
    let (key_lo, key_hi) = derive_pair(bucket_secret, own_sign_pub, peer_sign_pub);
    if own_sign_pub <= peer_sign_pub {
        key_hi
    } else {
        key_lo
    }
}

/// The full DHT key path for our outgoing store.
pub fn write_key_path(bucket_secret: &[u8; 32], own_sign_pub: &[u8; 32], peer_sign_pub: &[u8; 32]) -> String {
    let segment = construct_write_bucket_key(bucket_secret, own_sign_pub, peer_sign_pub);
    direct_offline_key(&segment, own_sign_pub)
}

/// The full DHT key path for the peer's outgoing store (what we poll).
pub fn read_key_path(bucket_secret: &[u8; 32], own_sign_pub: &[u8; 32], peer_sign_pub: &[u8; 32]) -> String {
    let segment = construct_read_bucket_key(bucket_secret, own_sign_pub, peer_sign_pub);
    direct_offline_key(&segment, peer_sign_pub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_keys_cross_match() {
        let secret = [9u8; 32];
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        let alice_write = write_key_path(&secret, &alice, &bob);
        let bob_read = read_key_path(&secret, &bob, &alice);
        assert_eq!(alice_write, bob_read);

        let bob_write = write_key_path(&secret, &bob, &alice);
        let alice_read = read_key_path(&secret, &alice, &bob);
        assert_eq!(bob_write, alice_read);
    }

    #[test]
    fn test_write_and_read_keys_differ() {
        let secret = [9u8; 32];
        let alice = [1u8; 32];
        let bob = [2u8; 32];
        assert_ne!(write_key_path(&secret, &alice, &bob), read_key_path(&secret, &alice, &bob));
    }
}
