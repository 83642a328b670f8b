use actix_web::{HttpResponse, get, post, web};
use log::debug;

use super::models::{
    AppState, MessageResponse, MinersResponse, RegisterMinersRequest, ReportResponse,
    RoundResponse, WorkerStatusResponse,
};
use crate::blockchain::Block;
use crate::error::NodeError;
use crate::mining::{MiningJob, WorkerRef};

/* -------------------- Manager side -------------------- */

/// List registered miner workers.
#[get("/cluster/")]
pub async fn get_cluster(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(MinersResponse {
        miners: state.miners(),
    })
}

#[post("/cluster/register/")]
pub async fn register_miners(
    state: web::Data<AppState>,
    body: web::Json<RegisterMinersRequest>,
) -> Result<HttpResponse, NodeError> {
    let miners = body
        .into_inner()
        .miners
        .ok_or_else(|| NodeError::validation("please supply a valid list of miners"))?;
    let miners = state.register_miners(&miners)?;
    Ok(HttpResponse::Created().json(MinersResponse { miners }))
}

/// Compose a candidate block and dispatch it to every worker.
#[post("/cluster/start/")]
pub async fn start_cluster(state: web::Data<AppState>) -> Result<HttpResponse, NodeError> {
    let node = state.into_inner();
    let round = node.start_round().await?;
    Ok(HttpResponse::Ok().json(RoundResponse {
        message: format!("Cluster mining initiated on {} workers", round.workers.len()),
        round,
    }))
}

/// A worker reports a solved block: `[block, {"node": address}]`.
#[post("/mining/report/")]
pub async fn report_block(
    state: web::Data<AppState>,
    body: web::Json<(Block, WorkerRef)>,
) -> Result<HttpResponse, NodeError> {
    let (block, worker) = body.into_inner();
    debug!("POST /mining/report/ - block #{} from {}", block.index, worker.node);
    let settled = state.submit_solution(block, &worker).await?;
    Ok(HttpResponse::Ok().json(ReportResponse {
        message: format!("Block accepted from {}", settled.winner),
        round: settled.round,
        index: settled.index,
        hash: settled.hash,
    }))
}

/* -------------------- Worker side -------------------- */

/// Receive a candidate block from the manager and start solving it.
#[post("/mining/start/")]
pub async fn start_mining(
    state: web::Data<AppState>,
    body: web::Json<MiningJob>,
) -> Result<HttpResponse, NodeError> {
    let node = state.into_inner();
    node.accept_job(body.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Transactions received, started mining",
    )))
}

#[post("/mining/stop/")]
pub async fn stop_mining(state: web::Data<AppState>) -> HttpResponse {
    let message = if state.stop_mining() {
        format!("Mining process stopped in node: {}", state.config.address)
    } else {
        format!("Node {} was not mining", state.config.address)
    };
    HttpResponse::Ok().json(MessageResponse::new(message))
}

#[get("/mining/status/")]
pub async fn mining_status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(WorkerStatusResponse {
        status: state.worker_status(),
    })
}
