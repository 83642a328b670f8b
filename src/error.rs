use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Malformed transaction or block fields, rejected at the boundary.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("block #{index} does not extend the chain: {reason}")]
    ChainLinkage { index: u64, reason: String },
    #[error("stale submission from {worker}: {reason}")]
    StaleSubmission { worker: String, reason: String },
    #[error("worker {0} is already solving")]
    WorkerBusy(String),
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },
    #[error("mining round {0} is still open")]
    RoundInProgress(u64),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NodeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unreachable(peer: &str, reason: impl ToString) -> Self {
        Self::PeerUnreachable {
            peer: peer.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ResponseError for NodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            NodeError::Validation(_) => StatusCode::BAD_REQUEST,
            NodeError::ChainLinkage { .. }
            | NodeError::StaleSubmission { .. }
            | NodeError::WorkerBusy(_)
            | NodeError::RoundInProgress(_) => StatusCode::CONFLICT,
            NodeError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
            NodeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
