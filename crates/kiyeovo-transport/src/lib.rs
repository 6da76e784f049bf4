//! # kiyeovo-transport
//!
//! The direct-session key exchange (spec §4.2, component C3), the
//! `CHAT_PROTOCOL` wire framing (spec §6), and the trait boundaries for the
//! collaborators this engine is embedded behind: the DHT client, the
//! libp2p stream transport, and the UI password prompt.

pub mod collaborators;
pub mod frame;
pub mod handshake;
pub mod rate_limit;

pub use collaborators::{
    ChatStream, DhtClient, DhtEvent, Keychain, PasswordPrompt, PasswordPromptRequest,
    PasswordPromptResponse, ProtocolHandler, StreamTransport,
};
pub use frame::{read_frame, write_frame, ChatFrame, FrameError, MAX_FRAME_BYTES};
pub use handshake::{
    accept_response, build_init, build_response, verify_init, HandshakeError, KeyExchangeInit,
    KeyExchangeResponse,
};
pub use rate_limit::KxRateLimiter;

/// The libp2p stream protocol name direct sessions and handshakes travel
/// over (spec §6).
pub const CHAT_PROTOCOL: &str = "/kiyeovo/chat/1.0.0";
