use super::pow::Difficulty;
use super::validator::is_valid_chain;
use super::Block;
use crate::error::{NodeError, Result};

/// In-memory chain. Only ever extended by one block or replaced wholesale.
#[derive(Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
    difficulty: Difficulty,
}

impl Blockchain {
    /// Initialize a new blockchain with the genesis block.
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            chain: vec![Block::genesis()],
            difficulty,
        }
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    /// Append a block that links to the current tail.
    pub fn append(&mut self, block: Block) -> Result<&Block> {
        let last = self.last_block();
        if block.index != last.index + 1 {
            return Err(NodeError::ChainLinkage {
                index: block.index,
                reason: format!("expected index {}", last.index + 1),
            });
        }
        let last_hash = last.hash();
        if block.previous_hash != last_hash {
            return Err(NodeError::ChainLinkage {
                index: block.index,
                reason: format!("previous_hash does not match tail hash {last_hash}"),
            });
        }
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Swap in a peer's chain. The caller is expected to have validated it;
    /// an empty or invalid chain is refused anyway.
    pub fn replace(&mut self, chain: Vec<Block>) -> Result<()> {
        if chain.is_empty() || !is_valid_chain(&chain, self.difficulty) {
            return Err(NodeError::validation("refusing to adopt an invalid chain"));
        }
        self.chain = chain;
        Ok(())
    }

    pub fn is_valid_chain(&self) -> bool {
        is_valid_chain(&self.chain, self.difficulty)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}
