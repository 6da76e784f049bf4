//! Canonical signed-byte encodings for the control-plane messages this
//! crate signs and verifies directly (as opposed to the DHT-record
//! encoders in `kiyeovo_dht::signing`, which only cover namespaces a
//! [`kiyeovo_dht::validators::Validator`] checks). Control messages never
//! touch the DHT themselves — they ride inside a sealed offline-bucket
//! message — so their signature is verified by the recipient's own
//! `kiyeovo-group` handler, not a DHT validator.

use kiyeovo_crypto::blake3::encode_multi_field;
use kiyeovo_types::control::{GroupInvite, GroupInviteResponse};

pub fn invite_signed_bytes(invite: &GroupInvite) -> Vec<u8> {
    encode_multi_field(&[
        invite.group_id.as_bytes(),
        invite.invite_id.as_bytes(),
        invite.group_name.as_bytes(),
        &invite.expires_at.to_be_bytes(),
    ])
}

pub fn invite_response_signed_bytes(response: &GroupInviteResponse) -> Vec<u8> {
    encode_multi_field(&[
        response.group_id.as_bytes(),
        response.invite_id.as_bytes(),
        &[response.accept as u8],
        response.message_id.as_bytes(),
        &response.timestamp.to_be_bytes(),
        &response.responder_peer_id,
    ])
}
