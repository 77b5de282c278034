//! HTTP surface of a node: transactions, mining, chain listing, peers and consensus.

use crate::{config::NodeConfig, error::ApiError, peers::HttpPeerTransport};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    chain::parse_peer_address, pow::ProofOfWork, resolve_conflicts, Block, ChainResponse, Ledger,
    LedgerError, Transaction,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub node_id: Arc<str>,
    pub transport: HttpPeerTransport,
}

impl AppState {
    pub fn new(config: &NodeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mut ledger = Ledger::with_pow(ProofOfWork::new(config.difficulty));
        for peer in &config.peers {
            ledger.register_peer(peer)?;
        }
        Ok(Self {
            ledger: Arc::new(RwLock::new(ledger)),
            node_id: config.node_id_or_generate().into(),
            transport: HttpPeerTransport::new(config.peer_timeout())?,
        })
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Head {
    height: u64,
    hash: String,
}

/// `amount` is a `u64`, so negative or fractional amounts are a 400.
#[derive(Deserialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct TxAccepted {
    message: String,
    index: u64,
}

#[derive(Serialize)]
struct Pending {
    transactions: Vec<Transaction>,
    count: usize,
}

#[derive(Serialize)]
struct Mined {
    message: &'static str,
    index: u64,
    timestamp: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    length: usize,
}

#[derive(Deserialize)]
struct RegisterIn {
    nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
struct Registered {
    message: &'static str,
    total_nodes: Vec<String>,
}

#[derive(Serialize)]
struct Nodes {
    nodes: Vec<String>,
    count: usize,
}

#[derive(Serialize)]
struct Resolved {
    message: &'static str,
    replaced: bool,
    chain: Vec<Block>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending))
        .route("/mine", get(mine))
        .route("/chain", get(full_chain))
        .route("/chain/head", get(head))
        .route("/chain/valid", get(valid_chain))
        .route("/nodes", get(list_nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(consensus))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn new_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TxIn>, JsonRejection>,
) -> Result<(StatusCode, Json<TxAccepted>), ApiError> {
    let Json(tx) = payload?;
    let index = state
        .ledger
        .write()
        .await
        .new_transaction(tx.sender, tx.recipient, tx.amount);
    Ok((
        StatusCode::CREATED,
        Json(TxAccepted {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
    ))
}

async fn pending(State(state): State<AppState>) -> Json<Pending> {
    let ledger = state.ledger.read().await;
    let transactions = ledger.pending().to_vec();
    Json(Pending {
        count: transactions.len(),
        transactions,
    })
}

/// Solve off the async runtime without holding the lock, then commit only if
/// the tip is unchanged.
async fn mine(State(state): State<AppState>) -> Result<Json<Mined>, ApiError> {
    let template = state.ledger.read().await.mining_template();
    let search = template.clone();
    let proof = tokio::task::spawn_blocking(move || search.solve_parallel())
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .ok_or(LedgerError::Aborted)?;

    let block = state
        .ledger
        .write()
        .await
        .commit_mined(&template, proof, &state.node_id)?
        .clone();
    info!(index = block.index, proof = block.proof, "New Block Forged");

    Ok(Json(Mined {
        message: "New Block Forged",
        index: block.index,
        timestamp: block.timestamp,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn full_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    Json(ChainResponse::from_chain(state.ledger.read().await.chain()))
}

async fn head(State(state): State<AppState>) -> Json<Head> {
    let (height, hash) = state.ledger.read().await.tip();
    Json(Head { height, hash })
}

async fn valid_chain(State(state): State<AppState>) -> Json<Validity> {
    let ledger = state.ledger.read().await;
    Json(Validity {
        valid: ledger_core::is_valid(ledger.chain(), ledger.pow()),
        length: ledger.len(),
    })
}

async fn list_nodes(State(state): State<AppState>) -> Json<Nodes> {
    let nodes: Vec<String> = state.ledger.read().await.peers().iter().cloned().collect();
    Json(Nodes {
        count: nodes.len(),
        nodes,
    })
}

async fn register_nodes(
    State(state): State<AppState>,
    payload: Result<Json<RegisterIn>, JsonRejection>,
) -> Result<(StatusCode, Json<Registered>), ApiError> {
    let Json(body) = payload?;
    // An empty list is a no-op that still reports the current peers.
    let Some(nodes) = body.nodes else {
        return Err(ApiError::BadRequest(
            "Please supply a valid list of nodes".into(),
        ));
    };
    // Reject the whole batch before touching the ledger.
    for node in &nodes {
        parse_peer_address(node)?;
    }

    let mut ledger = state.ledger.write().await;
    for node in &nodes {
        ledger.register_peer(node)?;
    }
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            message: "New nodes have been added",
            total_nodes: ledger.peers().iter().cloned().collect(),
        }),
    ))
}

async fn consensus(State(state): State<AppState>) -> Json<Resolved> {
    let replaced = resolve_conflicts(&state.ledger, &state.transport).await;
    let chain = state.ledger.read().await.chain().to_vec();
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Json(Resolved {
        message,
        replaced,
        chain,
    })
}
