//! # kiyeovo-node
//!
//! The node binary's own wiring crate: loads configuration, opens the
//! database, unlocks (or creates) the identity vault, and assembles every
//! engine crate into one [`Node`] that the binary drives with a
//! `tokio::select!` loop.
//!
//! Desktop UI/IPC is out of scope (spec Non-goals) — there is no RPC
//! server here, only the typed [`events::NodeEvents`] callback boundary
//! an embedder supplies directly.

pub mod chat;
pub mod config;
pub mod events;
/// In-memory DHT/transport/prompt fakes. Not gated behind `test-util`:
/// the binary itself uses these to run standalone without a real
/// libp2p/Mainline-DHT deployment, and `kiyeovo-integration-tests` reuses
/// them to drive whole-engine scenarios (spec §8).
pub mod fake;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use kiyeovo_group::config::GroupConfig;
use kiyeovo_group_offline::GroupOfflineConfig;
use kiyeovo_identity::{UnlockConfig, Vault};
use kiyeovo_offline::OfflineConfig;
use kiyeovo_scheduler::{Scheduler, SchedulerConfig};
use kiyeovo_transport::{DhtClient, PasswordPrompt, StreamTransport};
use kiyeovo_types::identity::Identity;

use crate::config::KiyeovoConfig;
use crate::events::{NodeEvents, SchedulerEventsAdapter};

/// Every external collaborator the spec names (§6), gathered for one
/// call to [`Node::start`].
pub struct Collaborators {
    pub dht: Arc<dyn DhtClient>,
    pub transport: Arc<dyn StreamTransport>,
    pub password_prompt: Arc<dyn PasswordPrompt>,
    pub events: Arc<dyn NodeEvents>,
}

/// The running engine: an unlocked identity, the live scheduler, and a
/// handle to request shutdown.
pub struct Node {
    pub identity: Identity,
    pub own_username: String,
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub dht: Arc<dyn DhtClient>,
    pub transport: Arc<dyn StreamTransport>,
    scheduler: Scheduler,
    sessions: Arc<tokio::sync::Mutex<kiyeovo_session::SessionMap>>,
    max_key_exchange_age_secs: u64,
    offline_message_ttl_ms: u64,
    shutdown_tx: broadcast::Sender<()>,
}

impl Node {
    /// Open the database at `data_dir`, unlock the identity with
    /// `password` (creating a fresh one if none exists yet), and build
    /// the scheduler.
    pub async fn start(
        data_dir: &Path,
        config: &KiyeovoConfig,
        own_username: String,
        password: &str,
        collaborators: Collaborators,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("kiyeovo.db");
        let conn = kiyeovo_db::open(&db_path)?;
        let db = Arc::new(Mutex::new(conn));

        let unlock_config = UnlockConfig {
            scrypt_log_n: config.identity.scrypt_log_n,
            worker_timeout: std::time::Duration::from_millis(config.identity.crypto_timeout_ms),
            max_failed_attempts: config.identity.max_failed_attempts,
            cooldown: std::time::Duration::from_secs(60),
        };
        let vault = Vault::new(db.clone(), unlock_config);

        let identity = match vault.unlock_with_password(password).await {
            Ok(identity) => identity,
            Err(kiyeovo_identity::IdentityError::NotFound) => {
                let (identity, _recovery_phrase) = vault.create(password).await?;
                identity
            }
            Err(err) => return Err(err.into()),
        };

        let offline_config = OfflineConfig {
            max_messages_per_store: config.offline.max_messages_per_store,
            mirror_ttl: std::time::Duration::from_secs(config.offline.mirror_ttl_secs),
        };
        let group_config = GroupConfig {
            invite_lifetime_ms: config.group.invite_lifetime_ms,
            max_members: config.group.max_members,
            invite_batch_size: config.group.invite_batch_size,
            ack_ttl_ms: config.group.ack_ttl_ms,
        };
        let group_offline_config = GroupOfflineConfig {
            message_ttl_ms: config.group_offline.message_ttl_ms,
            max_messages_per_sender: config.group_offline.max_messages_per_sender,
            store_max_compressed_bytes: config.group_offline.store_max_compressed_bytes,
            cleanup_interval: std::time::Duration::from_secs(config.group_offline.cleanup_interval_secs),
            local_cache_ttl: std::time::Duration::from_secs(config.group_offline.local_cache_ttl_secs),
            local_cache_max_entries: config.group_offline.local_cache_max_entries,
            rotation_grace_window_ms: config.group_offline.rotation_grace_window_ms,
        };
        let scheduler_config = SchedulerConfig {
            offline_poll_interval: std::time::Duration::from_secs(config.offline.offline_poll_interval_secs),
            pending_ack_interval: std::time::Duration::from_secs(config.group.pending_ack_interval_secs),
            group_offline_interval: std::time::Duration::from_secs(
                config.group_offline.group_offline_poll_interval_secs,
            ),
            session_sweep_interval: std::time::Duration::from_secs(config.session.session_cleanup_interval_secs),
            session_ttl_secs: config.session.session_ttl_secs,
            session_rotation_threshold: config.session.rotation_threshold,
        };

        let node_events = collaborators.events.clone();
        let scheduler_events = Arc::new(SchedulerEventsAdapter::new(collaborators.events));

        let scheduler = Scheduler::new(
            db.clone(),
            collaborators.dht.clone(),
            identity.clone(),
            own_username.clone(),
            offline_config,
            group_config,
            group_offline_config,
            scheduler_events,
            scheduler_config,
        );
        let sessions = scheduler.sessions_handle();

        let kx_rate_limiter = Arc::new(Mutex::new(kiyeovo_transport::KxRateLimiter::new(
            config.session.key_exchange_rate_limit_window_secs,
            config.session.key_exchange_rate_limit_max_attempts,
        )));

        let chat_handler = Arc::new(chat::ChatProtocolHandler::new(
            identity.clone(),
            db.clone(),
            sessions.clone(),
            node_events,
            config.session.max_key_exchange_age_secs,
            kx_rate_limiter,
        ));
        collaborators.transport.handle(kiyeovo_transport::CHAT_PROTOCOL, chat_handler);

        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            identity,
            own_username,
            db,
            dht: collaborators.dht,
            transport: collaborators.transport,
            scheduler,
            sessions,
            max_key_exchange_age_secs: config.session.max_key_exchange_age_secs,
            offline_message_ttl_ms: config.group_offline.message_ttl_ms,
            shutdown_tx,
        })
    }

    /// A handle callers can use to request a graceful shutdown from
    /// outside the running [`Node::run`] future.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run every background sweep until shutdown or Ctrl-C.
    pub async fn run(&mut self) {
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::select! {
            _ = self.scheduler.run(shutdown_rx) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received, shutting down");
            }
        }
    }
}
