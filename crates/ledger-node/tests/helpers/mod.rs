#![allow(dead_code)]

use ledger_node::{router, AppState, NodeConfig};
use tokio::net::TcpListener;

pub struct TestNode {
    pub base: String,
    pub addr: String,
    pub state: AppState,
}

/// Start a node on an ephemeral port and return its base URL.
pub async fn spawn_node(node_id: &str, difficulty: u32) -> anyhow::Result<TestNode> {
    let config = NodeConfig {
        node_id: Some(node_id.to_string()),
        difficulty,
        peer_timeout_secs: 2,
        ..NodeConfig::default()
    };
    let state = AppState::new(&config)?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    let app = router(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(TestNode {
        base: format!("http://{addr}"),
        addr,
        state,
    })
}

/// Serve an arbitrary router on an ephemeral port; returns host:port.
pub async fn spawn_router(app: axum::Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(addr)
}
