//! Typed free-function queries over `&Connection`, one module per entity
//! — no ORM.

pub mod chats;
pub mod contacts;
pub mod group_key_history;
pub mod group_offline;
pub mod identity;
pub mod login_attempts;
pub mod messages;
pub mod pending_acks;

fn peer_id_from_row(bytes: Vec<u8>) -> crate::Result<kiyeovo_types::PeerId> {
    bytes
        .try_into()
        .map_err(|_| crate::DbError::Serialization("peer_id must be 32 bytes".into()))
}
