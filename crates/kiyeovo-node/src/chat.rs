//! Direct chat send/receive (spec §4.2, §4.3): dial the peer over
//! `CHAT_PROTOCOL`, key-exchange if no live session exists yet, and send
//! an encrypted frame; fall back to the offline bucket (C4) the moment
//! any of that fails to reach the peer.
//!
//! Grounded on `kiyeovo_transport::handshake`/`frame` for the wire
//! protocol and `kiyeovo_offline::store::put` for the fallback, wired
//! together the way `kiyeovo_group::send::send_control_message` wires
//! offline sends for the control plane.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use kiyeovo_crypto::ed25519::SigningKey;
use kiyeovo_db::queries::{chats, contacts, messages};
use kiyeovo_offline::SenderInfo;
use kiyeovo_session::SessionMap;
use kiyeovo_transport::{
    accept_response, build_init, build_response, read_frame, verify_init, write_frame, ChatFrame,
    ChatStream, HandshakeError, KxRateLimiter, ProtocolHandler, CHAT_PROTOCOL,
};
use kiyeovo_types::message::{Message, MessageType};
use kiyeovo_types::PeerId;

use crate::events::NodeEvents;
use crate::Node;

impl Node {
    /// Send `content` to `peer_id` over the live session if one exists or
    /// can be freshly established; otherwise append it to the direct
    /// offline bucket (spec §4.3).
    pub async fn send_direct_message(&mut self, peer_id: PeerId, content: String, now: u64) -> anyhow::Result<()> {
        let chat = {
            let conn = self.db.lock().await;
            chats::get_by_peer_id(&conn, &peer_id)?
                .ok_or_else(|| anyhow::anyhow!("no direct chat with this peer yet"))?
        };

        let has_session = self.sessions.lock().await.contains(&peer_id);
        if !has_session {
            if let Err(err) = self.establish_session(&peer_id, now).await {
                tracing::info!(%err, "live key exchange failed, falling back to offline bucket");
                return self.send_direct_offline(&peer_id, &chat, &content, now).await;
            }
        }

        let message_id = Uuid::new_v4();
        let sent_live = match self.send_encrypted_live(&peer_id, &content, now).await {
            Ok(()) => true,
            Err(err) => {
                tracing::info!(%err, "live send failed, falling back to offline bucket");
                self.sessions.lock().await.remove(&peer_id);
                false
            }
        };

        if !sent_live {
            return self.send_direct_offline(&peer_id, &chat, &content, now).await;
        }

        let message = Message {
            id: message_id,
            chat_id: chat.id,
            sender_peer_id: self.identity.id,
            content,
            message_type: MessageType::Text,
            timestamp: now,
        };
        let conn = self.db.lock().await;
        messages::insert_if_new(&conn, &message)?;
        Ok(())
    }

    async fn establish_session(&mut self, peer_id: &PeerId, now: u64) -> anyhow::Result<()> {
        let mut stream = self
            .transport
            .dial_protocol(&hex::encode(peer_id), CHAT_PROTOCOL)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        let signing_key = SigningKey::from_bytes(&self.identity.sign_priv);
        let kx_id = Uuid::new_v4().to_string();
        let (init, ephemeral) = build_init(kx_id, self.identity.id, &signing_key, *peer_id, None, now);

        write_frame(&mut stream, &ChatFrame::KeyExchangeInit(init)).await?;

        match read_frame(&mut stream).await? {
            Some(ChatFrame::KeyExchangeResponse(response)) => {
                let (session, _bucket_secret) =
                    accept_response(&response, peer_id, ephemeral, now, self.max_key_exchange_age_secs)?;
                self.sessions.lock().await.insert(session);
                Ok(())
            }
            _ => Err(anyhow::anyhow!("peer did not answer the key exchange")),
        }
    }

    async fn send_encrypted_live(&mut self, peer_id: &PeerId, content: &str, now: u64) -> anyhow::Result<()> {
        let mut stream = self
            .transport
            .dial_protocol(&hex::encode(peer_id), CHAT_PROTOCOL)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(peer_id)
            .ok_or_else(|| anyhow::anyhow!("no live session"))?;
        let encrypted = kiyeovo_session::encrypt(session, &self.identity.id, now, content.as_bytes())?;
        drop(sessions);

        write_frame(
            &mut stream,
            &ChatFrame::Encrypted {
                content: encrypted.ciphertext,
                nonce: encrypted.nonce.to_vec(),
                sender_username: Some(self.own_username.clone()),
                offline_ack_timestamp: None,
            },
        )
        .await?;
        Ok(())
    }

    async fn send_direct_offline(
        &mut self,
        peer_id: &PeerId,
        chat: &kiyeovo_types::chat::Chat,
        content: &str,
        now: u64,
    ) -> anyhow::Result<()> {
        let bucket_secret = chat
            .offline_bucket_secret
            .ok_or_else(|| anyhow::anyhow!("chat has no offline bucket secret"))?;

        let contact = {
            let conn = self.db.lock().await;
            contacts::get(&conn, peer_id)?
        };

        let bucket_key = kiyeovo_offline::write_key_path(&bucket_secret, &self.identity.sign_pub, &contact.sign_pub);
        let peer_rsa_pub = kiyeovo_identity::decode_rsa_public(&contact.offline_rsa_pub)?;
        let sender_info = SenderInfo {
            peer_id: self.identity.id,
            username: self.own_username.clone(),
            offline_ack_timestamp: None,
        };

        let message_id = Uuid::new_v4();
        let expires_at = now + self.offline_message_ttl_ms;
        let offline_config = *self.scheduler.offline_config();

        kiyeovo_offline::put(
            self.scheduler.mirror_mut(),
            self.dht.as_ref(),
            &offline_config,
            &bucket_key,
            &self.identity,
            &peer_rsa_pub,
            &sender_info,
            message_id,
            content.as_bytes(),
            expires_at,
            now,
        )
        .await?;

        let message = Message {
            id: message_id,
            chat_id: chat.id,
            sender_peer_id: self.identity.id,
            content: content.to_string(),
            message_type: MessageType::Text,
            timestamp: now,
        };
        let conn = self.db.lock().await;
        messages::insert_if_new(&conn, &message)?;
        Ok(())
    }
}

/// Inbound `CHAT_PROTOCOL` handler: accepts a key exchange and installs the
/// responder side of the session, or decrypts a content frame against an
/// already-live one. A frame with no matching session is simply dropped —
/// the sender will notice and fall back to its own offline bucket (spec
/// §4.2 step 2, §4.3).
pub struct ChatProtocolHandler {
    identity: kiyeovo_types::identity::Identity,
    db: Arc<Mutex<rusqlite::Connection>>,
    sessions: Arc<Mutex<SessionMap>>,
    events: Arc<dyn NodeEvents>,
    max_key_exchange_age_secs: u64,
    kx_rate_limiter: Arc<Mutex<KxRateLimiter>>,
}

impl ChatProtocolHandler {
    pub fn new(
        identity: kiyeovo_types::identity::Identity,
        db: Arc<Mutex<rusqlite::Connection>>,
        sessions: Arc<Mutex<SessionMap>>,
        events: Arc<dyn NodeEvents>,
        max_key_exchange_age_secs: u64,
        kx_rate_limiter: Arc<Mutex<KxRateLimiter>>,
    ) -> Self {
        Self {
            identity,
            db,
            sessions,
            events,
            max_key_exchange_age_secs,
            kx_rate_limiter,
        }
    }

    async fn store_and_notify(&self, sender_peer_id: PeerId, plaintext: Vec<u8>, now: u64) {
        let Ok(content) = String::from_utf8(plaintext) else {
            tracing::warn!("dropped non-utf8 direct message payload");
            return;
        };
        let conn = self.db.lock().await;
        let Ok(Some(chat)) = chats::get_by_peer_id(&conn, &sender_peer_id) else {
            tracing::info!("dropped direct message from a peer with no local chat");
            return;
        };
        let message = Message {
            id: Uuid::new_v4(),
            chat_id: chat.id,
            sender_peer_id,
            content,
            message_type: MessageType::Text,
            timestamp: now,
        };
        if let Ok(true) = messages::insert_if_new(&conn, &message) {
            self.events.on_message_received(&message);
        }
    }
}

#[async_trait]
impl ProtocolHandler for ChatProtocolHandler {
    async fn handle(&self, peer_id: &str, mut stream: Box<dyn ChatStream>) {
        let now = now_ms();
        let frame = match read_frame(&mut stream).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(peer_id, %err, "failed to read inbound chat frame");
                return;
            }
        };

        match frame {
            ChatFrame::KeyExchangeInit(init) => {
                if let Err(err) = verify_init(&init, &self.identity.id, now, self.max_key_exchange_age_secs) {
                    tracing::warn!(peer_id, %err, "rejected key exchange init");
                    return;
                }

                {
                    let conn = self.db.lock().await;
                    if let Ok(contact) = contacts::get(&conn, &init.initiator_peer_id) {
                        if contact.blocked {
                            let err = HandshakeError::Blocked;
                            tracing::warn!(peer_id, %err, "rejected key exchange init");
                            return;
                        }
                    }
                }

                if let Err(retry_after_secs) = self
                    .kx_rate_limiter
                    .lock()
                    .await
                    .check_and_record(init.initiator_peer_id, now)
                {
                    let err = HandshakeError::RateLimited { retry_after_secs };
                    tracing::warn!(peer_id, %err, "rejected key exchange init");
                    return;
                }

                let signing_key = SigningKey::from_bytes(&self.identity.sign_priv);
                let (response, session, _bucket_secret) = build_response(&init, &signing_key, now);
                if let Err(err) = write_frame(&mut stream, &ChatFrame::KeyExchangeResponse(response)).await {
                    tracing::warn!(peer_id, %err, "failed to answer key exchange");
                    return;
                }
                self.sessions.lock().await.insert(session);
            }
            ChatFrame::Encrypted { content, nonce, .. } => {
                let sender_peer_id = init_sender(peer_id);
                let mut sessions = self.sessions.lock().await;
                let Some(session) = sessions.get_mut(&sender_peer_id) else {
                    tracing::info!(peer_id, "dropped encrypted frame with no live session");
                    return;
                };
                let Ok(nonce_bytes): Result<[u8; kiyeovo_crypto::xchacha20::NONCE_SIZE], _> = nonce.try_into() else {
                    tracing::warn!(peer_id, "malformed nonce on inbound encrypted frame");
                    return;
                };
                let expected_counter = session.message_count;
                let encrypted = kiyeovo_session::EncryptedMessage {
                    nonce: nonce_bytes,
                    counter: expected_counter,
                    ciphertext: content,
                };
                let result = kiyeovo_session::decrypt(session, &sender_peer_id, now, &encrypted);
                drop(sessions);
                match result {
                    Ok(plaintext) => self.store_and_notify(sender_peer_id, plaintext, now).await,
                    Err(err) => tracing::warn!(peer_id, %err, "rejected tampered or stale encrypted frame"),
                }
            }
            ChatFrame::Plain { .. } => {
                tracing::info!(peer_id, "ignoring unauthenticated plain frame");
            }
        }
    }
}

/// The inbound handler only ever gets the dialer's transport-level peer id
/// as a string; over `CHAT_PROTOCOL` that string is always the hex-encoded
/// application `PeerId`, matching the encoding `dial_protocol` is called
/// with on the send side.
fn init_sender(peer_id: &str) -> PeerId {
    let mut out = [0u8; 32];
    if let Ok(bytes) = hex::decode(peer_id) {
        if bytes.len() == 32 {
            out.copy_from_slice(&bytes);
        }
    }
    out
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
