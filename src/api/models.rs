use crate::blockchain::Block;
use crate::mining::{RoundSummary, WorkerStatus};
use crate::network::HttpClient;
use crate::node::Node;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Node context shared by all handlers.
pub type AppState = Node<HttpClient>;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    pub chain: Vec<Block>,
}

/* ---------- TX API Models ---------- */

#[derive(Serialize)]
pub struct NewTxResponse {
    pub message: String,
    pub target_block_index: u64,
    pub transaction_id: String,
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub transactions: Vec<Transaction>,
    pub size: usize,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub count: usize,
}

/* ---------- Node registry Models ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<String>,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct RegisterMinersRequest {
    pub miners: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct MinersResponse {
    pub miners: Vec<String>,
}

#[derive(Serialize)]
pub struct RoundResponse {
    pub message: String,
    pub round: RoundSummary,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub round: u64,
    pub index: u64,
    pub hash: String,
}

#[derive(Serialize)]
pub struct WorkerStatusResponse {
    pub status: WorkerStatus,
}
