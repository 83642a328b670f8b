pub mod manager;
pub mod worker;

use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::transaction::Transaction;

pub use manager::RoundSummary;
pub use worker::WorkerStatus;

/// Candidate block sent from the manager to each worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningJob {
    pub transactions: Vec<Transaction>,
    pub last_block: Block,
}

/// Identifies the worker reporting a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRef {
    pub node: String,
}
