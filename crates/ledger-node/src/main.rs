use clap::Parser;
use ledger_node::{router, AppState, NodeConfig};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// TOML file with node settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Identifier credited with mining rewards (random when omitted)
    #[arg(long)]
    node_id: Option<String>,

    /// Leading zero hex characters required of a proof digest
    #[arg(long)]
    difficulty: Option<u32>,

    /// Peer URL to register at start-up; repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Timeout for fetching a peer's chain, in seconds
    #[arg(long)]
    peer_timeout_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(node_id) = self.node_id {
            config.node_id = Some(node_id);
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(secs) = self.peer_timeout_secs {
            config.peer_timeout_secs = secs;
        }
        config.peers.extend(self.peers);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Args::parse().into_config()?;
    let state = AppState::new(&config)?;
    info!(
        node_id = %state.node_id,
        difficulty = config.difficulty,
        peers = config.peers.len(),
        "node initialised"
    );

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("ledger-node listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("ledger-node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
