//! The `Chat` entity and its state machine (spec §3, §4.4).

use serde::{Deserialize, Serialize};

use crate::{ChatId, GroupId, PeerId};

/// Direct (1:1) or group chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Direct,
    Group,
}

/// Overall chat lifecycle status (direct chats only use these two).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Active,
    Pending,
}

/// Group-specific status, following the state machine in spec §4.4:
///
/// ```text
/// invited_pending ── accept ──▶ awaiting_activation ── welcome ──▶ active
/// invited_pending ── reject ──▶ invite_expired
/// invited_pending ── ttl ─────▶ invite_expired
/// active ── kicked/left ─────▶ (row retained; no sends)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    InvitedPending,
    AwaitingActivation,
    Active,
    InviteExpired,
}

impl GroupStatus {
    /// Whether this chat should still participate in sends/receives.
    pub fn is_live(self) -> bool {
        matches!(self, GroupStatus::Active)
    }
}

/// A chat row (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub chat_type: ChatType,
    pub name: String,
    pub peer_id: Option<PeerId>,
    pub created_by: PeerId,
    pub status: ChatStatus,
    pub group_id: Option<GroupId>,
    pub group_creator: Option<PeerId>,
    pub group_status: Option<GroupStatus>,
    /// Monotonically nondecreasing; equals the highest key_version in
    /// Group Key History for this group (invariant I1).
    pub key_version: u64,
    /// Shared secret from which both parties derive the direct offline
    /// bucket keys. `None` for group chats, which use C6 instead.
    pub offline_bucket_secret: Option<[u8; 32]>,
    pub offline_last_read_ts: u64,
    pub offline_last_ack_sent: u64,
    pub trusted_out_of_band: bool,
    pub muted: bool,
    pub participants: Vec<PeerId>,
}

impl Chat {
    /// Whether a direct send to this chat should attempt the live stream
    /// (vs. going straight to the offline path). Group chats with a
    /// non-active status never send.
    pub fn can_send(&self) -> bool {
        match self.chat_type {
            ChatType::Direct => self.status == ChatStatus::Active,
            ChatType::Group => self.group_status.map(GroupStatus::is_live).unwrap_or(false),
        }
    }
}
