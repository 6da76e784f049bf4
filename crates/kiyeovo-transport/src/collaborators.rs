//! The external collaborator interfaces this engine is embedded behind
//! (spec §6): the DHT, the libp2p stream layer, and the UI's password
//! prompt. Kiyeovo only ever talks to these through traits so the node
//! binary can supply real libp2p/UI-backed implementations while tests
//! supply fakes.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// One event emitted while a DHT operation is in flight.
#[derive(Clone, Debug)]
pub enum DhtEvent {
    /// A peer answered our query (used to detect `DhtPutNoPeers`).
    PeerResponse { peer_id: String },
    /// A value was found for a `get`.
    Value(Vec<u8>),
    /// The operation has no more events to emit.
    Done,
}

/// The subset of a Mainline-DHT-style client Kiyeovo needs: signed mutable
/// and immutable record get/put, reported as an event stream rather than a
/// single future so callers can react to `PeerResponse` events as they
/// arrive (spec §6: "dht.put ... AsyncIter<Event>").
#[async_trait]
pub trait DhtClient: Send + Sync {
    async fn get(&self, key: &[u8]) -> Vec<DhtEvent>;
    async fn put(&self, key: &[u8], value: &[u8]) -> Vec<DhtEvent>;
}

/// A bidirectional byte stream for one dialed or inbound `CHAT_PROTOCOL`
/// connection.
pub trait ChatStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> ChatStream for T {}

/// Handles one inbound stream for a registered protocol.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    async fn handle(&self, peer_id: &str, stream: Box<dyn ChatStream>);
}

/// The libp2p-level stream transport: registering inbound handlers and
/// dialing peers for a named protocol (spec §6).
#[async_trait]
pub trait StreamTransport: Send + Sync {
    fn handle(&self, protocol: &str, handler: std::sync::Arc<dyn ProtocolHandler>);
    async fn dial_protocol(
        &self,
        peer_id: &str,
        protocol: &str,
    ) -> Result<Box<dyn ChatStream>, String>;
}

/// The UI's password-prompt dialog (spec §6). `is_new` distinguishes first
/// run (create) from unlock; `recovery_phrase`/`prefilled` let the caller
/// offer recovery-phrase entry or a remembered value; `cooldown_secs` and
/// `error` surface vault-side failure state back into the dialog.
#[derive(Clone, Debug, Default)]
pub struct PasswordPromptRequest {
    pub label: String,
    pub is_new: bool,
    pub recovery_phrase: Option<String>,
    pub prefilled: Option<String>,
    pub error: Option<String>,
    pub cooldown_secs: Option<u64>,
    pub show_recovery: bool,
    pub keychain_available: bool,
}

#[derive(Clone, Debug)]
pub struct PasswordPromptResponse {
    pub password: String,
    pub remember_me: bool,
    pub use_recovery_phrase: bool,
}

#[async_trait]
pub trait PasswordPrompt: Send + Sync {
    async fn prompt(&self, request: PasswordPromptRequest) -> PasswordPromptResponse;
}

/// The optional OS keychain (spec §6): absent on platforms without one.
#[async_trait]
pub trait Keychain: Send + Sync {
    async fn get_password(&self, account: &str) -> Option<String>;
    async fn set_password(&self, account: &str, password: &str) -> Result<(), String>;
}
