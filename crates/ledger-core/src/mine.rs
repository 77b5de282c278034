use crate::pow::ProofOfWork;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Searches proofs in parallel for one that solves the puzzle against `last_proof`.
/// Returns the same proof as the sequential search (the smallest), or `None`
/// if `abort` was raised before the search finished.
pub fn solve_parallel(pow: &ProofOfWork, last_proof: u64, abort: &AtomicBool) -> Option<u64> {
    // Once aborted every candidate "matches", so the search unwinds quickly;
    // the result is re-checked below.
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_first(|proof| abort.load(Ordering::Relaxed) || pow.verify(last_proof, *proof));

    match found {
        Some(proof) if !abort.load(Ordering::Relaxed) && pow.verify(last_proof, proof) => {
            info!(
                "Solved proof {} against {} at difficulty {}",
                proof,
                last_proof,
                pow.difficulty()
            );
            Some(proof)
        }
        _ => {
            debug!(last_proof, "proof search aborted");
            None
        }
    }
}
