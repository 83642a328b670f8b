use actix_web::{HttpResponse, get, web};

use super::models::{AppState, ChainResponse, ResolveResponse, ValidateResponse};
use crate::error::NodeError;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> HttpResponse {
    let chain = state.chain_snapshot();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> HttpResponse {
    let bc = state.chain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ValidateResponse {
        valid: bc.is_valid_chain(),
        length: bc.len(),
    })
}

/// Consensus: adopt the longest valid chain among known peers.
#[get("/nodes/resolve/")]
pub async fn resolve(state: web::Data<AppState>) -> Result<HttpResponse, NodeError> {
    let res = state.resolve_conflicts().await?;
    let message = if res.replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Ok(HttpResponse::Ok().json(ResolveResponse {
        message: message.to_string(),
        replaced: res.replaced,
        chain: res.chain,
    }))
}
