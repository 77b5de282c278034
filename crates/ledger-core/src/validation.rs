//! Chain validity, independent of any particular ledger.

use crate::{chain::genesis_block, error::ChainError, pow::ProofOfWork, Block};

/// Walk `chain` pairwise and report the first block that breaks hash linkage,
/// fails the proof-of-work check, or skips an index.
///
/// Empty and single-block chains are valid.
pub fn validate_chain(chain: &[Block], pow: &ProofOfWork) -> Result<(), ChainError> {
    for pair in chain.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.previous_hash != prev.hash() {
            return Err(ChainError::BrokenLink { index: cur.index });
        }
        if !pow.verify(prev.proof, cur.proof) {
            return Err(ChainError::InvalidProof {
                index: cur.index,
                last_proof: prev.proof,
                proof: cur.proof,
            });
        }
        let expected = prev.index.wrapping_add(1);
        if cur.index != expected {
            return Err(ChainError::IndexGap {
                index: cur.index,
                expected,
            });
        }
    }
    Ok(())
}

pub fn is_valid(chain: &[Block], pow: &ProofOfWork) -> bool {
    validate_chain(chain, pow).is_ok()
}

/// [`validate_chain`], and the chain must also open with our genesis block.
/// Required of any chain a ledger adopts.
pub fn validate_from_genesis(chain: &[Block], pow: &ProofOfWork) -> Result<(), ChainError> {
    match chain.first() {
        None => Err(ChainError::Empty),
        Some(first) if *first != genesis_block() => {
            Err(ChainError::ForeignGenesis { index: first.index })
        }
        Some(_) => validate_chain(chain, pow),
    }
}
