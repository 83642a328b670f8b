use super::block::{Block, total_size};
use super::pow::{Difficulty, valid_proof};
use crate::error::{NodeError, Result};

/// Check that `next` may follow `prev`: contiguous index, hash linkage,
/// declared size and proof-of-work.
pub fn validate_successor(prev: &Block, next: &Block, difficulty: Difficulty) -> Result<()> {
    let prev_hash = prev.hash();

    if next.previous_hash != prev_hash {
        return Err(NodeError::ChainLinkage {
            index: next.index,
            reason: format!(
                "previous_hash {} does not match tail hash {}",
                next.previous_hash, prev_hash
            ),
        });
    }
    if next.index != prev.index + 1 {
        return Err(NodeError::ChainLinkage {
            index: next.index,
            reason: format!("expected index {}", prev.index + 1),
        });
    }

    let actual = total_size(&next.transactions);
    if next.size != actual {
        return Err(NodeError::validation(format!(
            "block #{} declares size {} but carries {}",
            next.index, next.size, actual
        )));
    }

    if !valid_proof(prev.proof, next.proof, &prev_hash, difficulty) {
        return Err(NodeError::validation(format!(
            "block #{} proof {} does not solve the puzzle",
            next.index, next.proof
        )));
    }
    Ok(())
}

/// Walk every adjacent pair. Empty and genesis-only chains are valid.
pub fn is_valid_chain(chain: &[Block], difficulty: Difficulty) -> bool {
    chain
        .windows(2)
        .all(|pair| validate_successor(&pair[0], &pair[1], difficulty).is_ok())
}
