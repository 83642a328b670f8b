use actix_web::{HttpResponse, get, post, web};
use log::{debug, info};
use std::time::Instant;

use super::models::{AppState, GenerateRequest, MessageResponse, NewTxResponse, PendingResponse};
use crate::error::NodeError;
use crate::transaction::NewTransaction;

/// Submit a new transaction into the pool.
#[post("/transactions/new/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTransaction>,
) -> Result<HttpResponse, NodeError> {
    let t0 = Instant::now();
    let (tx, target) = state.submit_transaction(body.into_inner())?;
    info!(
        "POST /transactions/new/ - tx {} OK ({} ms)",
        tx.id,
        t0.elapsed().as_millis()
    );

    Ok(HttpResponse::Created().json(NewTxResponse {
        message: format!("Transaction will be added to Block {target}"),
        target_block_index: target,
        transaction_id: tx.id,
    }))
}

/// List pending transactions.
#[get("/transactions/")]
pub async fn get_pending(state: web::Data<AppState>) -> HttpResponse {
    let transactions = state.pending_transactions();
    HttpResponse::Ok().json(PendingResponse {
        size: transactions.len(),
        transactions,
    })
}

/// DEV generator: fill the pool with random transfers.
#[post("/transactions/generate/")]
pub async fn generate_transactions(
    state: web::Data<AppState>,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, NodeError> {
    let generated = state.generate_transactions(body.count)?;
    debug!("POST /transactions/generate/ - {generated} txs queued");
    Ok(HttpResponse::Ok().json(MessageResponse::new(format!(
        "{generated} transactions generated!"
    ))))
}
