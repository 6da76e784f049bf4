//! # kiyeovo-types
//!
//! Shared data types for the Kiyeovo messaging engine: the entities of the
//! data model (identity, contacts, chats, messages, sessions), the
//! control-plane and offline-bucket wire formats, and the group-info DHT
//! record shapes. Kept dependency-free of any one component crate so every
//! other `kiyeovo-*` crate can share one vocabulary.

pub mod chat;
pub mod contact;
pub mod control;
pub mod group;
pub mod groupinfo;
pub mod identity;
pub mod message;
pub mod offline_direct;
pub mod offline_group;
pub mod session;

/// A peer's identity, derived from the BLAKE3 hash of its libp2p public key.
pub type PeerId = [u8; 32];

/// A group's identifier, a UUID assigned at creation.
pub type GroupId = uuid::Uuid;

/// A chat's identifier, a UUID assigned at creation.
pub type ChatId = uuid::Uuid;

/// A message's identifier, a UUID assigned by the sender. The dedup key.
pub type MessageId = uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub type EpochMillis = u64;
