//! On-disk configuration (spec §6 "Configuration knobs"): nested
//! per-concern sub-structs, each field defaulted via
//! `#[serde(default = "...")]` so an old config file without a new field
//! still deserializes, a `load()` that falls back to `Default` when no
//! file exists, and a platform-specific `default_data_dir()` overridable
//! by an environment variable (`KIYEOVO_DATA_DIR`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KiyeovoConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub offline: OfflineKnobs,
    #[serde(default)]
    pub group: GroupKnobs,
    #[serde(default)]
    pub group_offline: GroupOfflineKnobs,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: String::new() }
    }
}

/// `IDENTITY_SCRYPT_N`, `CRYPTO_TIMEOUT`, `MAX_KEY_EXCHANGE_AGE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_scrypt_log_n")]
    pub scrypt_log_n: u8,
    #[serde(default = "default_crypto_timeout_ms")]
    pub crypto_timeout_ms: u64,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            scrypt_log_n: default_scrypt_log_n(),
            crypto_timeout_ms: default_crypto_timeout_ms(),
            max_failed_attempts: default_max_failed_attempts(),
        }
    }
}

/// `MAX_KEY_EXCHANGE_AGE`, `KEY_EXCHANGE_RATE_LIMIT`, `MESSAGE_TIMEOUT`,
/// `SESSION_MANAGER_CLEANUP_INTERVAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_key_exchange_age_secs")]
    pub max_key_exchange_age_secs: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_session_cleanup_interval_secs")]
    pub session_cleanup_interval_secs: u64,
    #[serde(default = "default_rotation_threshold")]
    pub rotation_threshold: u64,
    #[serde(default = "default_key_exchange_rate_limit_window_secs")]
    pub key_exchange_rate_limit_window_secs: u64,
    #[serde(default = "default_key_exchange_rate_limit_max_attempts")]
    pub key_exchange_rate_limit_max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_key_exchange_age_secs: default_max_key_exchange_age_secs(),
            message_timeout_ms: default_message_timeout_ms(),
            session_ttl_secs: default_session_ttl_secs(),
            session_cleanup_interval_secs: default_session_cleanup_interval_secs(),
            rotation_threshold: default_rotation_threshold(),
            key_exchange_rate_limit_window_secs: default_key_exchange_rate_limit_window_secs(),
            key_exchange_rate_limit_max_attempts: default_key_exchange_rate_limit_max_attempts(),
        }
    }
}

/// `MAX_MESSAGES_PER_STORE`, `MESSAGE_TTL`, `CHATS_TO_CHECK_FOR_OFFLINE_MESSAGES`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineKnobs {
    #[serde(default = "default_max_messages_per_store")]
    pub max_messages_per_store: usize,
    #[serde(default = "default_mirror_ttl_secs")]
    pub mirror_ttl_secs: u64,
    #[serde(default = "default_offline_poll_interval_secs")]
    pub offline_poll_interval_secs: u64,
}

impl Default for OfflineKnobs {
    fn default() -> Self {
        Self {
            max_messages_per_store: default_max_messages_per_store(),
            mirror_ttl_secs: default_mirror_ttl_secs(),
            offline_poll_interval_secs: default_offline_poll_interval_secs(),
        }
    }
}

/// `GROUP_MAX_MEMBERS`, `GROUP_INVITE_LIFETIME`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupKnobs {
    #[serde(default = "default_group_max_members")]
    pub max_members: usize,
    #[serde(default = "default_group_invite_lifetime_ms")]
    pub invite_lifetime_ms: u64,
    #[serde(default = "default_group_invite_batch_size")]
    pub invite_batch_size: usize,
    #[serde(default = "default_group_ack_ttl_ms")]
    pub ack_ttl_ms: u64,
    #[serde(default = "default_pending_ack_interval_secs")]
    pub pending_ack_interval_secs: u64,
}

impl Default for GroupKnobs {
    fn default() -> Self {
        Self {
            max_members: default_group_max_members(),
            invite_lifetime_ms: default_group_invite_lifetime_ms(),
            invite_batch_size: default_group_invite_batch_size(),
            ack_ttl_ms: default_group_ack_ttl_ms(),
            pending_ack_interval_secs: default_pending_ack_interval_secs(),
        }
    }
}

/// `GROUP_MAX_MESSAGES_PER_SENDER`, `GROUP_OFFLINE_MESSAGE_TTL_MS`,
/// `GROUP_OFFLINE_STORE_MAX_COMPRESSED_BYTES`,
/// `GROUP_OFFLINE_CLEANUP_INTERVAL_MS`, `GROUP_OFFLINE_LOCAL_CACHE_TTL_MS`,
/// `GROUP_OFFLINE_LOCAL_CACHE_MAX_ENTRIES`, `GROUP_ROTATION_GRACE_WINDOW_MS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOfflineKnobs {
    #[serde(default = "default_group_max_messages_per_sender")]
    pub max_messages_per_sender: usize,
    #[serde(default = "default_group_offline_message_ttl_ms")]
    pub message_ttl_ms: u64,
    #[serde(default = "default_group_offline_store_max_compressed_bytes")]
    pub store_max_compressed_bytes: usize,
    #[serde(default = "default_group_offline_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_group_offline_local_cache_ttl_secs")]
    pub local_cache_ttl_secs: u64,
    #[serde(default = "default_group_offline_local_cache_max_entries")]
    pub local_cache_max_entries: usize,
    #[serde(default = "default_group_rotation_grace_window_ms")]
    pub rotation_grace_window_ms: u64,
    #[serde(default = "default_group_offline_poll_interval_secs")]
    pub group_offline_poll_interval_secs: u64,
}

impl Default for GroupOfflineKnobs {
    fn default() -> Self {
        Self {
            max_messages_per_sender: default_group_max_messages_per_sender(),
            message_ttl_ms: default_group_offline_message_ttl_ms(),
            store_max_compressed_bytes: default_group_offline_store_max_compressed_bytes(),
            cleanup_interval_secs: default_group_offline_cleanup_interval_secs(),
            local_cache_ttl_secs: default_group_offline_local_cache_ttl_secs(),
            local_cache_max_entries: default_group_offline_local_cache_max_entries(),
            rotation_grace_window_ms: default_group_rotation_grace_window_ms(),
            group_offline_poll_interval_secs: default_group_offline_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_scrypt_log_n() -> u8 {
    15
}
fn default_crypto_timeout_ms() -> u64 {
    5_000
}
fn default_max_failed_attempts() -> u32 {
    10
}
fn default_max_key_exchange_age_secs() -> u64 {
    30
}
fn default_message_timeout_ms() -> u64 {
    10_000
}
fn default_session_ttl_secs() -> u64 {
    300
}
fn default_session_cleanup_interval_secs() -> u64 {
    60
}
fn default_rotation_threshold() -> u64 {
    1_000
}
fn default_key_exchange_rate_limit_window_secs() -> u64 {
    60
}
fn default_key_exchange_rate_limit_max_attempts() -> u32 {
    5
}
fn default_max_messages_per_store() -> usize {
    200
}
fn default_mirror_ttl_secs() -> u64 {
    300
}
fn default_offline_poll_interval_secs() -> u64 {
    30
}
fn default_group_max_members() -> usize {
    200
}
fn default_group_invite_lifetime_ms() -> u64 {
    14 * 24 * 60 * 60 * 1000
}
fn default_group_invite_batch_size() -> usize {
    3
}
fn default_group_ack_ttl_ms() -> u64 {
    24 * 60 * 60 * 1000
}
fn default_pending_ack_interval_secs() -> u64 {
    60
}
fn default_group_max_messages_per_sender() -> usize {
    500
}
fn default_group_offline_message_ttl_ms() -> u64 {
    14 * 24 * 60 * 60 * 1000
}
fn default_group_offline_store_max_compressed_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_group_offline_cleanup_interval_secs() -> u64 {
    600
}
fn default_group_offline_local_cache_ttl_secs() -> u64 {
    300
}
fn default_group_offline_local_cache_max_entries() -> usize {
    512
}
fn default_group_rotation_grace_window_ms() -> u64 {
    2 * 24 * 60 * 60 * 1000
}
fn default_group_offline_poll_interval_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl KiyeovoConfig {
    /// Load configuration from the default config file location, falling
    /// back to defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: KiyeovoConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("KIYEOVO_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("KIYEOVO_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Kiyeovo")
        }
        #[cfg(target_os = "linux")]
        {
            dirs_fallback(".kiyeovo")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Kiyeovo")
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            dirs_fallback(".kiyeovo")
        }
    }
}

fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/kiyeovo"))
}
