use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod mine;
pub mod validation;

pub use chain::{Ledger, MiningTemplate};
pub use consensus::{resolve_conflicts, select_longest_chain, ChainResponse, PeerTransport};
pub use error::{ChainError, LedgerError, TransportError};
pub use validation::{is_valid, validate_chain};

pub type Hash = [u8; 32];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    /// Unsigned: a negative amount fails to deserialize, so it never reaches the pool.
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// True for the synthesized transaction that pays a miner.
    pub fn is_reward(&self) -> bool {
        self.sender == constants::REWARD_SENDER
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

// Field declaration order is the serialization order, so both records list
// their fields alphabetically.
#[derive(Serialize)]
struct CanonicalTransaction<'a> {
    amount: u64,
    recipient: &'a str,
    sender: &'a str,
}

#[derive(Serialize)]
struct CanonicalBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof: u64,
    timestamp: u64,
    transactions: Vec<CanonicalTransaction<'a>>,
}

impl Block {
    /// Compact JSON with keys sorted by name at every level.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = CanonicalBlock {
            index: self.index,
            previous_hash: &self.previous_hash,
            proof: self.proof,
            timestamp: self.timestamp,
            transactions: self
                .transactions
                .iter()
                .map(|t| CanonicalTransaction {
                    amount: t.amount,
                    recipient: &t.recipient,
                    sender: &t.sender,
                })
                .collect(),
        };
        serde_json::to_vec(&canonical).expect("canonical block encoding is infallible")
    }

    /// Lowercase hex SHA-256 of the canonical encoding.
    pub fn hash(&self) -> String {
        hex::encode(sha256(&self.canonical_bytes()))
    }
}

pub fn hash_block(block: &Block) -> String {
    block.hash()
}

pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub mod pow {
    use super::{constants, sha256, Hash};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// The puzzle: find `p'` such that SHA-256 of the decimal strings of
    /// `p` and `p'` concatenated starts with `difficulty` zero hex characters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ProofOfWork {
        difficulty: u32,
    }

    impl Default for ProofOfWork {
        fn default() -> Self {
            Self::new(constants::POW_DIFFICULTY)
        }
    }

    impl ProofOfWork {
        pub fn new(difficulty: u32) -> Self {
            Self {
                difficulty: difficulty.min(constants::HASH_HEX_SIZE as u32),
            }
        }

        pub fn difficulty(&self) -> u32 {
            self.difficulty
        }

        pub fn verify(&self, last_proof: u64, proof: u64) -> bool {
            valid_proof(last_proof, proof, self.difficulty)
        }

        /// Linear search from 0; returns the smallest valid proof.
        pub fn solve(&self, last_proof: u64) -> u64 {
            let mut proof = 0u64;
            while !self.verify(last_proof, proof) {
                proof += 1;
            }
            proof
        }

        /// Same search as [`solve`](Self::solve), giving up with `None` once `abort` is raised.
        pub fn solve_until(&self, last_proof: u64, abort: &AtomicBool) -> Option<u64> {
            let mut proof = 0u64;
            loop {
                if abort.load(Ordering::Relaxed) {
                    return None;
                }
                if self.verify(last_proof, proof) {
                    return Some(proof);
                }
                proof = proof.checked_add(1)?;
            }
        }
    }

    pub fn proof_digest(last_proof: u64, proof: u64) -> Hash {
        sha256(format!("{last_proof}{proof}").as_bytes())
    }

    pub fn valid_proof(last_proof: u64, proof: u64, difficulty: u32) -> bool {
        count_leading_zero_nibbles(&proof_digest(last_proof, proof)) >= difficulty
    }

    /// Number of leading `0` characters in the hex form of `hash`.
    pub fn count_leading_zero_nibbles(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else {
                if *b < 0x10 {
                    total += 1;
                }
                break;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn sample_block() -> Block {
        Block {
            index: 2,
            timestamp: 1_700_000_000,
            transactions: vec![Transaction::new("a", "b", 5), Transaction::new("0", "node", 1)],
            proof: 7,
            previous_hash: "abc".to_string(),
        }
    }

    #[test]
    fn leading_zero_nibbles_examples() {
        let mut h = [0u8; 32];
        assert_eq!(pow::count_leading_zero_nibbles(&h), 64);
        h[0] = 0x0F;
        assert_eq!(pow::count_leading_zero_nibbles(&h), 1);
        h[0] = 0xF0;
        assert_eq!(pow::count_leading_zero_nibbles(&h), 0);
        h = [0u8; 32];
        h[2] = 0x01;
        assert_eq!(pow::count_leading_zero_nibbles(&h), 5);
    }

    #[test]
    fn canonical_bytes_sorts_keys() {
        let json = String::from_utf8(sample_block().canonical_bytes()).unwrap();
        let expected = r#"{"index":2,"previous_hash":"abc","proof":7,"timestamp":1700000000,"transactions":[{"amount":5,"recipient":"b","sender":"a"},{"amount":1,"recipient":"node","sender":"0"}]}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn block_hash_example() {
        let hash = sample_block().hash();
        assert_eq!(hash, "30d8fb0088f02e513d637ef22099c28e5e44e466643ee585f4575d46f46abb72");
        assert_eq!(hash.len(), constants::HASH_HEX_SIZE);
        assert_eq!(hash_block(&sample_block()), hash);
    }

    #[test]
    fn genesis_hash_example() {
        let genesis = chain::genesis_block();
        assert_eq!(
            genesis.hash(),
            "6b0674965973f03bf8d1218ce690307776a30f88e1855dea61556fe61843d3f0"
        );
    }

    #[test]
    fn equal_blocks_hash_identically() {
        let a = sample_block();
        let b = Block {
            previous_hash: "abc".into(),
            proof: 7,
            transactions: vec![
                Transaction { amount: 5, recipient: "b".into(), sender: "a".into() },
                Transaction::new("0", "node", 1),
            ],
            timestamp: 1_700_000_000,
            index: 2,
        };
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn transaction_order_changes_hash() {
        let a = sample_block();
        let mut b = a.clone();
        b.transactions.reverse();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn block_hash_changes_with_proof() {
        let a = sample_block();
        let mut b = a.clone();
        b.proof += 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn verify_reference_proof() {
        let pow = pow::ProofOfWork::default();
        assert_eq!(pow.difficulty(), 4);
        assert!(pow.verify(100, 35293));
        assert!(!pow.verify(100, 35292));
        assert_eq!(
            hex::encode(pow::proof_digest(100, 35293)),
            "0000c415de5ceea33c02daa85a1c218ecca1b1c9e9864ed34d183597844de8e2"
        );
    }

    #[test]
    fn solve_returns_first_valid_proof() {
        let pow = pow::ProofOfWork::default();
        assert_eq!(pow.solve(100), 35293);

        let easy = pow::ProofOfWork::new(2);
        let proof = easy.solve(100);
        assert_eq!(proof, 226);
        assert!(easy.verify(100, proof));
        assert!((0..proof).all(|p| !easy.verify(100, p)));
    }

    #[test]
    fn zero_difficulty_accepts_anything() {
        let pow = pow::ProofOfWork::new(0);
        assert_eq!(pow.solve(12345), 0);
        assert!(pow.verify(1, 2));
    }

    #[test]
    fn difficulty_is_capped_at_digest_width() {
        assert_eq!(pow::ProofOfWork::new(1_000).difficulty(), 64);
    }

    #[test]
    fn solve_until_honours_abort() {
        let pow = pow::ProofOfWork::default();
        let abort = AtomicBool::new(true);
        assert_eq!(pow.solve_until(100, &abort), None);
        let running = AtomicBool::new(false);
        assert_eq!(pow.solve_until(100, &running), Some(35293));
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = Transaction::new("a", "b", 5);
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, r#"{"sender":"a","recipient":"b","amount":5}"#);
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
        assert!(!tx.is_reward());
        assert!(Transaction::new("0", "miner", 1).is_reward());
    }

    #[test]
    fn negative_amount_does_not_deserialize() {
        let err = serde_json::from_str::<Transaction>(r#"{"sender":"a","recipient":"b","amount":-5}"#);
        assert!(err.is_err());
        let err = serde_json::from_str::<Transaction>(r#"{"sender":"a","recipient":"b","amount":1.5}"#);
        assert!(err.is_err());
    }

    #[test]
    fn block_json_survives_transport() {
        let block = sample_block();
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash(), block.hash());
    }

    #[test]
    fn block_rejects_missing_fields() {
        let json = r#"{"index":2,"timestamp":1,"transactions":[],"proof":3}"#;
        assert!(serde_json::from_str::<Block>(json).is_err());
    }
}
