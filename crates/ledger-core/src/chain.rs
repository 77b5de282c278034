use crate::{
    constants::{
        GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, GENESIS_TIMESTAMP, MINING_REWARD,
        REWARD_SENDER,
    },
    error::LedgerError,
    mine, now_secs,
    pow::ProofOfWork,
    validation::validate_from_genesis,
    Block, Transaction,
};
use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, info};

/// The genesis block every ledger starts from. Deterministic so that
/// independently started nodes share it.
pub fn genesis_block() -> Block {
    Block {
        index: GENESIS_INDEX,
        timestamp: GENESIS_TIMESTAMP,
        transactions: vec![],
        proof: GENESIS_PROOF,
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
    }
}

/// Snapshot of the tip a miner works against.
///
/// The abort flag is raised by the ledger as soon as the tip changes, which
/// stops any search still running against it.
#[derive(Clone, Debug)]
pub struct MiningTemplate {
    pub index: u64,
    pub last_proof: u64,
    pub previous_hash: String,
    pub pow: ProofOfWork,
    abort: Arc<AtomicBool>,
}

impl MiningTemplate {
    pub fn abort_flag(&self) -> &AtomicBool {
        &self.abort
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub fn solve(&self) -> Option<u64> {
        self.pow.solve_until(self.last_proof, &self.abort)
    }

    pub fn solve_parallel(&self) -> Option<u64> {
        mine::solve_parallel(&self.pow, self.last_proof, &self.abort)
    }
}

/// A node's chain, its pending transaction pool and its known peers.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    peers: BTreeSet<String>,
    pow: ProofOfWork,
    abort: Arc<AtomicBool>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_pow(ProofOfWork::default())
    }

    pub fn with_pow(pow: ProofOfWork) -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
            peers: BTreeSet::new(),
            pow,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block is never removed.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn peers(&self) -> &BTreeSet<String> {
        &self.peers
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("ledger always holds the genesis block")
    }

    /// Return (index, hash) of the last block.
    pub fn tip(&self) -> (u64, String) {
        let last = self.last_block();
        (last.index, last.hash())
    }

    /// Queue a transaction; returns the index of the block that will hold it.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.add_transaction(Transaction::new(sender, recipient, amount))
    }

    pub fn add_transaction(&mut self, tx: Transaction) -> u64 {
        debug!(sender = %tx.sender, recipient = %tx.recipient, amount = tx.amount, "queued transaction");
        self.pending.push(tx);
        self.last_block().index + 1
    }

    /// Append a block committing every pending transaction. `previous_hash`
    /// defaults to the hash of the current last block.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> &Block {
        let previous_hash = previous_hash.unwrap_or_else(|| self.last_block().hash());
        let block = Block {
            index: self.last_block().index + 1,
            timestamp: now_secs(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };
        info!(
            index = block.index,
            proof = block.proof,
            txs = block.transactions.len(),
            "appended block"
        );
        self.chain.push(block);
        self.advance_tip();
        self.last_block()
    }

    /// Record the host[:port] part of `address` as a peer. Idempotent.
    pub fn register_peer(&mut self, address: &str) -> Result<String, LedgerError> {
        let netloc = parse_peer_address(address)?;
        if self.peers.insert(netloc.clone()) {
            info!(peer = %netloc, "registered peer");
        }
        Ok(netloc)
    }

    pub fn mining_template(&self) -> MiningTemplate {
        let last = self.last_block();
        MiningTemplate {
            index: last.index + 1,
            last_proof: last.proof,
            previous_hash: last.hash(),
            pow: self.pow,
            abort: Arc::clone(&self.abort),
        }
    }

    /// Finish a block mined against `template`: queue the reward to
    /// `reward_recipient`, then append. Fails if the tip moved since the
    /// template was taken.
    pub fn commit_mined(
        &mut self,
        template: &MiningTemplate,
        proof: u64,
        reward_recipient: &str,
    ) -> Result<&Block, LedgerError> {
        let (index, hash) = self.tip();
        if template.index != index + 1 || template.previous_hash != hash {
            return Err(LedgerError::StaleTemplate {
                index: template.index,
            });
        }
        if !self.pow.verify(template.last_proof, proof) {
            return Err(LedgerError::InvalidProof { proof });
        }
        self.new_transaction(REWARD_SENDER, reward_recipient, MINING_REWARD);
        Ok(self.new_block(proof, Some(template.previous_hash.clone())))
    }

    /// Solve against the current tip, reward `reward_recipient` and append.
    pub fn mine(&mut self, reward_recipient: &str) -> Result<&Block, LedgerError> {
        let template = self.mining_template();
        let proof = template.solve().ok_or(LedgerError::Aborted)?;
        self.commit_mined(&template, proof, reward_recipient)
    }

    /// Swap in `candidate` wholesale if it is strictly longer, starts at our
    /// genesis block and is valid.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), LedgerError> {
        if candidate.len() <= self.chain.len() {
            return Err(LedgerError::NotLonger {
                candidate: candidate.len(),
                local: self.chain.len(),
            });
        }
        validate_from_genesis(&candidate, &self.pow)?;
        info!(
            from = self.chain.len(),
            to = candidate.len(),
            "replaced local chain"
        );
        self.chain = candidate;
        self.advance_tip();
        Ok(())
    }

    fn advance_tip(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
        self.abort = Arc::new(AtomicBool::new(false));
    }
}

/// Extract host[:port] from a URL such as `http://10.0.0.2:5000/`. A bare
/// `host:port` is accepted as is.
pub fn parse_peer_address(address: &str) -> Result<String, LedgerError> {
    let invalid = || LedgerError::InvalidPeerAddress(address.to_string());
    let trimmed = address.trim();
    let rest = match trimmed.split_once("://") {
        Some(("", _)) => return Err(invalid()),
        Some((_, rest)) => rest,
        None => trimmed,
    };
    let netloc = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if netloc.is_empty() || netloc.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(netloc.to_string())
}
