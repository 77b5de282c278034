//! Longest-valid-chain conflict resolution.

use crate::{
    chain::Ledger, error::TransportError, pow::ProofOfWork, validation::validate_from_genesis,
    Block,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Body of a chain listing, as served by every node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn from_chain(chain: &[Block]) -> Self {
        Self {
            chain: chain.to_vec(),
            length: chain.len(),
        }
    }

    /// The chain, provided the reported length matches what was sent.
    pub fn into_chain(self, peer: &str) -> Result<Vec<Block>, TransportError> {
        if self.length != self.chain.len() {
            return Err(TransportError::LengthMismatch {
                peer: peer.to_string(),
                reported: self.length,
                actual: self.chain.len(),
            });
        }
        Ok(self.chain)
    }
}

/// Fetches a peer's chain. `peer` is a host[:port] as stored by the ledger.
pub trait PeerTransport: Send + Sync {
    fn fetch_chain(
        &self,
        peer: &str,
    ) -> impl Future<Output = Result<ChainResponse, TransportError>> + Send;
}

/// Scan peer outcomes in order and keep the longest valid chain that beats
/// `local_len`. Failed, invalid or foreign-genesis peers are skipped. Equal
/// lengths never win.
pub fn select_longest_chain<I>(local_len: usize, pow: &ProofOfWork, outcomes: I) -> Option<Vec<Block>>
where
    I: IntoIterator<Item = (String, Result<ChainResponse, TransportError>)>,
{
    let mut max_length = local_len;
    let mut best = None;

    for (peer, outcome) in outcomes {
        let chain = match outcome.and_then(|response| response.into_chain(&peer)) {
            Ok(chain) => chain,
            Err(err) => {
                warn!(%peer, error = %err, "skipping peer");
                continue;
            }
        };
        if chain.len() <= max_length {
            debug!(%peer, length = chain.len(), max_length, "peer chain not longer");
            continue;
        }
        match validate_from_genesis(&chain, pow) {
            Ok(()) => {
                debug!(%peer, length = chain.len(), "new best candidate");
                max_length = chain.len();
                best = Some(chain);
            }
            Err(err) => warn!(%peer, error = %err, "rejecting invalid chain"),
        }
    }
    best
}

/// Ask every known peer for its chain and adopt the longest valid one if it
/// is strictly longer than ours. Returns whether the local chain was replaced.
///
/// The ledger lock is not held while peers are queried.
pub async fn resolve_conflicts<T: PeerTransport>(ledger: &RwLock<Ledger>, transport: &T) -> bool {
    let (peers, local_len, pow) = {
        let ledger = ledger.read().await;
        let peers: Vec<String> = ledger.peers().iter().cloned().collect();
        (peers, ledger.len(), *ledger.pow())
    };
    if peers.is_empty() {
        debug!("no peers to resolve against");
        return false;
    }

    let outcomes = join_all(peers.into_iter().map(|peer| async move {
        let outcome = transport.fetch_chain(&peer).await;
        (peer, outcome)
    }))
    .await;

    let Some(candidate) = select_longest_chain(local_len, &pow, outcomes) else {
        info!(length = local_len, "local chain is authoritative");
        return false;
    };

    // Our chain may have grown while the peers were being queried. Every other
    // valid candidate is no longer than this one, so a refusal here covers them too.
    match ledger.write().await.replace_chain(candidate) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "discarded candidate chain");
            false
        }
    }
}
