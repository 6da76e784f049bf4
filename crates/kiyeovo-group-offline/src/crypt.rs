//! Content encryption and signing for one `GroupContentMessage` (spec §4.5:
//! "XChaCha20-Poly1305 under the epoch key", "ed25519 by sender").

use kiyeovo_crypto::blake3::encode_multi_field;
use kiyeovo_crypto::ed25519::{Signature, VerifyingKey};
use kiyeovo_crypto::{xchacha20, CryptoError, Result};
use kiyeovo_identity::sign;
use kiyeovo_types::identity::Identity;
use kiyeovo_types::offline_group::GroupContentMessage;
use kiyeovo_types::{GroupId, MessageId};

/// Binds the ciphertext to its `(group, epoch, seq)` slot so a message
/// cannot be replayed into a different epoch or reordered across senders
/// undetected even if the signature check were skipped.
fn content_aad(group_id: GroupId, key_version: u64, seq: u64) -> Vec<u8> {
    encode_multi_field(&[group_id.as_bytes(), &key_version.to_be_bytes(), &seq.to_be_bytes()])
}

/// Encrypt, sign, and assemble one content message for the local mirror's
/// next `seq`.
#[allow(clippy::too_many_arguments)]
pub fn build_signed_message(
    identity: &Identity,
    group_id: GroupId,
    key_version: u64,
    message_id: MessageId,
    message_type: kiyeovo_types::message::MessageType,
    epoch_key: &[u8; 32],
    seq: u64,
    plaintext: &[u8],
    now: u64,
) -> Result<GroupContentMessage> {
    let aad = content_aad(group_id, key_version, seq);
    let (nonce, encrypted_content) = xchacha20::seal(epoch_key, plaintext, &aad)?;

    let mut message = GroupContentMessage {
        group_id,
        key_version,
        sender_peer_id: identity.id,
        message_id,
        seq,
        encrypted_content,
        nonce,
        timestamp: now,
        message_type,
        signature: [0u8; 64],
    };
    let signed_bytes =
        serde_json::to_vec(&message.signed_fields()).map_err(|e| CryptoError::Serialization(e.to_string()))?;
    message.signature = sign(identity, &signed_bytes).to_bytes();
    Ok(message)
}

/// Verify `message`'s signature against `sender_sign_pub` and, on success,
/// decrypt its content under `epoch_key`.
pub fn verify_and_decrypt(
    message: &GroupContentMessage,
    sender_sign_pub: &[u8; 32],
    epoch_key: &[u8; 32],
) -> Result<Vec<u8>> {
    let sender_pub = VerifyingKey::from_bytes(sender_sign_pub)?;
    let signed_bytes =
        serde_json::to_vec(&message.signed_fields()).map_err(|e| CryptoError::Serialization(e.to_string()))?;
    sender_pub
        .verify(&signed_bytes, &Signature::from_bytes(&message.signature))
        .map_err(|_| CryptoError::SignatureVerification)?;

    let aad = content_aad(message.group_id, message.key_version, message.seq);
    xchacha20::decrypt(epoch_key, &message.nonce, &message.encrypted_content, &aad)
}
