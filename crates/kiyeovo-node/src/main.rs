//! kiyeovo-node: the Kiyeovo messaging daemon.
//!
//! Single OS process running a Tokio async runtime, embedding a DHT
//! client and libp2p stream transport supplied by the platform layer.
//! There is no IPC/UI surface (spec Non-goals) — an embedder links this
//! crate directly and drives [`kiyeovo_node::Node`] itself; this binary
//! exists to prove the wiring compiles and runs standalone against the
//! in-process fakes.

use std::sync::Arc;

use tracing::info;

use kiyeovo_node::config::KiyeovoConfig;
use kiyeovo_node::events::NullNodeEvents;
use kiyeovo_node::fake::{AlwaysOfflineTransport, FakeDht};
use kiyeovo_node::{Collaborators, Node};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kiyeovo=info".parse()?),
        )
        .init();

    info!("kiyeovo node starting");

    let config = KiyeovoConfig::load()?;
    let data_dir = config.data_dir();
    let own_username = std::env::var("KIYEOVO_USERNAME").unwrap_or_else(|_| "anonymous".to_string());
    let password = std::env::var("KIYEOVO_PASSWORD")
        .map_err(|_| anyhow::anyhow!("KIYEOVO_PASSWORD must be set to unlock or create an identity"))?;

    let collaborators = Collaborators {
        dht: Arc::new(FakeDht::new()),
        transport: Arc::new(AlwaysOfflineTransport),
        password_prompt: Arc::new(kiyeovo_node::fake::NoPrompt),
        events: Arc::new(NullNodeEvents),
    };

    let mut node = Node::start(&data_dir, &config, own_username, &password, collaborators).await?;

    info!(peer_id = %hex::encode(node.identity.id), "identity ready");

    node.run().await;

    info!("kiyeovo node stopped");
    Ok(())
}
