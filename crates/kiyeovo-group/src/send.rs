//! Routes a group control-plane message through its target's direct
//! offline bucket (spec §4.4: every control message is sent "through the
//! pair's direct offline bucket (C4)").

use rusqlite::Connection;

use kiyeovo_db::queries::{chats, contacts};
use kiyeovo_offline::{BucketMirror, OfflineConfig, SenderInfo};
use kiyeovo_transport::DhtClient;
use kiyeovo_types::control::GroupControlMessage;
use kiyeovo_types::identity::Identity;
use kiyeovo_types::PeerId;

use crate::GroupError;

/// Serialize, RSA-seal, and append `message` to our outgoing bucket for
/// `target_peer_id`, then publish it (spec §4.4, §4.3). The target must
/// already be a known, non-blocked contact with an established direct
/// chat — both are prerequisites of being in a group roster at all.
#[allow(clippy::too_many_arguments)]
pub async fn send_control_message(
    conn: &Connection,
    mirror: &mut BucketMirror,
    dht: &dyn DhtClient,
    config: &OfflineConfig,
    identity: &Identity,
    own_username: &str,
    target_peer_id: PeerId,
    message: &GroupControlMessage,
    expires_at: u64,
    now: u64,
) -> Result<(), GroupError> {
    let contact = contacts::get(conn, &target_peer_id)?;
    let chat = chats::get_by_peer_id(conn, &target_peer_id)?
        .ok_or(GroupError::NoDirectChat(target_peer_id))?;
    let bucket_secret = chat
        .offline_bucket_secret
        .ok_or(GroupError::NoDirectChat(target_peer_id))?;

    let bucket_key =
        kiyeovo_offline::write_key_path(&bucket_secret, &identity.sign_pub, &contact.sign_pub);
    let peer_rsa_pub = kiyeovo_identity::decode_rsa_public(&contact.offline_rsa_pub)?;

    let plaintext = serde_json::to_vec(message)?;
    let sender_info = SenderInfo {
        peer_id: identity.id,
        username: own_username.to_string(),
        offline_ack_timestamp: None,
    };

    kiyeovo_offline::put(
        mirror,
        dht,
        config,
        &bucket_key,
        identity,
        &peer_rsa_pub,
        &sender_info,
        uuid::Uuid::new_v4(),
        &plaintext,
        expires_at,
        now,
    )
    .await?;
    Ok(())
}
