//! # kiyeovo-session
//!
//! The direct-session manager (spec §3, §4.2, component C2): holds the live
//! `Session` map and the message AEAD.
//!
//! Per spec §9 ("Global mutable state ... members of the owner struct, not
//! process globals"), [`SessionMap`] is a plain value held by whatever owns
//! it — it is not itself behind a `Mutex`. TTL eviction and rotation checks
//! are driven by the scheduler (C9), not a background task owned here.

mod map;
mod message;

pub use kiyeovo_types::session::Session;
pub use map::SessionMap;
pub use message::{decrypt, encrypt, EncryptedMessage, MessageError, Result};
