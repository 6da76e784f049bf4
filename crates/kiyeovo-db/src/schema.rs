//! SQL schema definitions (spec §3, plus the expansions noted in
//! `SPEC_FULL.md` §3: `login_attempts` for the vault cooldown).

/// Complete schema for Kiyeovo v1.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Identity (C1)
-- ============================================================

CREATE TABLE IF NOT EXISTS identity_envelopes (
    peer_id BLOB NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('password', 'recovery')),
    salt BLOB NOT NULL,
    nonce BLOB NOT NULL,
    ciphertext BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (peer_id, kind)
);

CREATE TABLE IF NOT EXISTS login_attempts (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    failed_count INTEGER NOT NULL DEFAULT 0,
    last_attempt_at INTEGER NOT NULL DEFAULT 0,
    cooldown_until INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Contacts (users)
-- ============================================================

CREATE TABLE IF NOT EXISTS contacts (
    peer_id BLOB PRIMARY KEY,
    username TEXT NOT NULL,
    sign_pub BLOB NOT NULL,
    offline_rsa_pub BLOB NOT NULL,
    handshake_sig BLOB,
    blocked INTEGER NOT NULL DEFAULT 0,
    added_at INTEGER NOT NULL
);

-- ============================================================
-- Chats
-- ============================================================

CREATE TABLE IF NOT EXISTS chats (
    id BLOB PRIMARY KEY,
    chat_type TEXT NOT NULL CHECK (chat_type IN ('direct', 'group')),
    name TEXT NOT NULL,
    peer_id BLOB,
    created_by BLOB NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('active', 'pending')),
    group_id BLOB,
    group_creator BLOB,
    group_status TEXT,
    key_version INTEGER NOT NULL DEFAULT 0,
    offline_bucket_secret BLOB,
    offline_last_read_ts INTEGER NOT NULL DEFAULT 0,
    offline_last_ack_sent INTEGER NOT NULL DEFAULT 0,
    trusted_out_of_band INTEGER NOT NULL DEFAULT 0,
    muted INTEGER NOT NULL DEFAULT 0,
    participants_json TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_chats_group_id ON chats(group_id);
CREATE INDEX IF NOT EXISTS idx_chats_peer_id ON chats(peer_id);

-- ============================================================
-- Messages
-- ============================================================

CREATE TABLE IF NOT EXISTS messages (
    id BLOB PRIMARY KEY,
    chat_id BLOB NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    sender_peer_id BLOB NOT NULL,
    content TEXT NOT NULL,
    message_type TEXT NOT NULL CHECK (message_type IN ('text', 'file', 'image', 'system')),
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id, timestamp);

-- ============================================================
-- Group control plane (C5)
-- ============================================================

CREATE TABLE IF NOT EXISTS pending_acks (
    group_id BLOB NOT NULL,
    target_peer_id BLOB NOT NULL,
    message_type TEXT NOT NULL CHECK (
        message_type IN ('group_invite', 'group_invite_response', 'group_welcome', 'group_state_update')
    ),
    message_id TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (group_id, target_peer_id, message_type)
);

CREATE TABLE IF NOT EXISTS group_key_history (
    group_id BLOB NOT NULL,
    key_version INTEGER NOT NULL,
    key BLOB NOT NULL,
    state_hash BLOB NOT NULL,
    used_until INTEGER,
    PRIMARY KEY (group_id, key_version)
);

-- ============================================================
-- Group offline epochs (C6)
-- ============================================================

CREATE TABLE IF NOT EXISTS group_offline_cursors (
    group_id BLOB NOT NULL,
    key_version INTEGER NOT NULL,
    sender_peer_id BLOB NOT NULL,
    last_read_ts INTEGER NOT NULL DEFAULT 0,
    last_read_message_id TEXT,
    PRIMARY KEY (group_id, key_version, sender_peer_id)
);

CREATE TABLE IF NOT EXISTS group_member_seqs (
    group_id BLOB NOT NULL,
    key_version INTEGER NOT NULL,
    sender_peer_id BLOB NOT NULL,
    highest_seen_seq INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (group_id, key_version, sender_peer_id)
);
"#;
