//! The [`Scheduler`]: owns every piece of state the background sweeps
//! touch and drives them on independent `tokio::time::interval` ticks,
//! shutting down cleanly on a broadcast signal.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use kiyeovo_group::config::GroupConfig;
use kiyeovo_group_offline::{BucketCache, GroupOfflineConfig};
use kiyeovo_offline::{BucketMirror, OfflineConfig};
use kiyeovo_session::SessionMap;
use kiyeovo_transport::DhtClient;
use kiyeovo_types::identity::Identity;

use crate::config::SchedulerConfig;
use crate::events::SchedulerEvents;
use crate::{group_offline, offline, pending_acks, sessions};

/// Everything a sweep needs, gathered in one place so `kiyeovo-node` only
/// has to construct one of these at startup.
pub struct Scheduler {
    conn: Arc<Mutex<rusqlite::Connection>>,
    dht: Arc<dyn DhtClient>,
    mirror: BucketMirror,
    group_cache: BucketCache,
    identity: Identity,
    own_username: String,
    offline_config: OfflineConfig,
    group_config: GroupConfig,
    group_offline_config: GroupOfflineConfig,
    sessions: Arc<Mutex<SessionMap>>,
    events: Arc<dyn SchedulerEvents>,
    config: SchedulerConfig,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conn: Arc<Mutex<rusqlite::Connection>>,
        dht: Arc<dyn DhtClient>,
        identity: Identity,
        own_username: String,
        offline_config: OfflineConfig,
        group_config: GroupConfig,
        group_offline_config: GroupOfflineConfig,
        events: Arc<dyn SchedulerEvents>,
        config: SchedulerConfig,
    ) -> Self {
        let mirror = BucketMirror::new(offline_config.mirror_ttl);
        let group_cache =
            BucketCache::new(group_offline_config.local_cache_ttl, group_offline_config.local_cache_max_entries);
        Self {
            conn,
            dht,
            mirror,
            group_cache,
            identity,
            own_username,
            offline_config,
            group_config,
            group_offline_config,
            sessions: Arc::new(Mutex::new(SessionMap::new())),
            events,
            config,
        }
    }

    /// A shared handle to the live session map, so a `ProtocolHandler`
    /// registered with the transport (and therefore invoked on its own
    /// task, independent of the scheduler's own sweep loop) can install
    /// and read sessions concurrently with the session sweep.
    pub fn sessions_handle(&self) -> Arc<Mutex<SessionMap>> {
        self.sessions.clone()
    }

    /// Direct access to the bucket write-mirror, for a caller (e.g. the
    /// node's direct-message send path) that needs to fall back to an
    /// offline-bucket put outside of a scheduled sweep.
    pub fn mirror_mut(&mut self) -> &mut BucketMirror {
        &mut self.mirror
    }

    pub fn offline_config(&self) -> &OfflineConfig {
        &self.offline_config
    }

    /// Run every sweep on its own interval until `shutdown` fires.
    ///
    /// Each branch is independent: a slow or failing sweep on one timer
    /// never blocks the others.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut offline_tick = tokio::time::interval(self.config.offline_poll_interval);
        let mut ack_tick = tokio::time::interval(self.config.pending_ack_interval);
        let mut group_tick = tokio::time::interval(self.config.group_offline_interval);
        let mut retire_tick = tokio::time::interval(self.group_offline_config.cleanup_interval);
        let mut session_tick = tokio::time::interval(self.config.session_sweep_interval);

        loop {
            tokio::select! {
                _ = offline_tick.tick() => self.run_offline_sweep().await,
                _ = ack_tick.tick() => self.run_pending_ack_sweep().await,
                _ = group_tick.tick() => self.run_group_offline_sweep().await,
                _ = retire_tick.tick() => self.run_group_retirement_sweep().await,
                _ = session_tick.tick() => self.run_session_sweep().await,
                _ = shutdown.recv() => {
                    tracing::info!("scheduler shutting down");
                    return;
                }
            }
        }
    }

    async fn run_offline_sweep(&mut self) {
        let now = now_ms();
        let conn = self.conn.lock().await;
        offline::sweep_direct_offline(
            &conn,
            &mut self.mirror,
            self.dht.as_ref(),
            &self.offline_config,
            &self.group_config,
            &self.identity,
            &self.own_username,
            self.events.as_ref(),
            now,
        )
        .await;
    }

    async fn run_pending_ack_sweep(&mut self) {
        let now = now_ms();
        let conn = self.conn.lock().await;
        pending_acks::sweep_pending_acks(
            &conn,
            &mut self.mirror,
            self.dht.as_ref(),
            &self.offline_config,
            &self.group_config,
            &self.identity,
            &self.own_username,
            now,
        )
        .await;
    }

    async fn run_group_offline_sweep(&mut self) {
        let now = now_ms();
        let conn = self.conn.lock().await;
        group_offline::sweep_group_offline(
            &conn,
            self.dht.as_ref(),
            &self.group_offline_config,
            &self.identity,
            self.events.as_ref(),
            now,
        )
        .await;
    }

    async fn run_group_retirement_sweep(&mut self) {
        let now = now_ms();
        let conn = self.conn.lock().await;
        group_offline::sweep_group_retirement(
            &conn,
            self.dht.as_ref(),
            &mut self.group_cache,
            &self.group_offline_config,
            &self.identity,
            now,
        )
        .await;
    }

    async fn run_session_sweep(&mut self) {
        let now = now_ms();
        let mut sessions = self.sessions.lock().await;
        sessions::sweep_sessions(&mut sessions, &self.config, self.events.as_ref(), now);
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
