use thiserror::Error;

/// Why a candidate chain failed validation. `index` is the offending block's index field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("block {index}: previous_hash does not match the hash of the block before it")]
    BrokenLink { index: u64 },
    #[error("block {index}: proof {proof} does not solve the puzzle for previous proof {last_proof}")]
    InvalidProof { index: u64, last_proof: u64, proof: u64 },
    #[error("block {index}: expected index {expected}")]
    IndexGap { index: u64, expected: u64 },
    #[error("chain starts at block {index}, not at the genesis block")]
    ForeignGenesis { index: u64 },
    #[error("chain is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid peer address: {0:?}")]
    InvalidPeerAddress(String),
    #[error("replacement chain rejected: {0}")]
    InvalidChain(#[from] ChainError),
    #[error("replacement chain of length {candidate} is not longer than local chain of length {local}")]
    NotLonger { candidate: usize, local: usize },
    #[error("proof {proof} does not extend the current tip")]
    InvalidProof { proof: u64 },
    #[error("chain moved on while mining block {index}")]
    StaleTemplate { index: u64 },
    #[error("mining aborted")]
    Aborted,
}

/// Failure to obtain a usable chain from one peer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {peer} failed: {reason}")]
    Request { peer: String, reason: String },
    #[error("{peer} answered with status {status}")]
    Status { peer: String, status: u16 },
    #[error("{peer} sent a malformed body: {reason}")]
    Malformed { peer: String, reason: String },
    #[error("{peer} reported length {reported} but sent {actual} blocks")]
    LengthMismatch { peer: String, reported: usize, actual: usize },
}
