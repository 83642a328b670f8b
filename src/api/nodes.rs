use actix_web::{HttpResponse, get, post, web};

use super::models::{AppState, NodesResponse, RegisterNodesRequest, RegisterNodesResponse};
use crate::error::NodeError;

#[post("/nodes/register/")]
pub async fn register_nodes(
    state: web::Data<AppState>,
    body: web::Json<RegisterNodesRequest>,
) -> Result<HttpResponse, NodeError> {
    let nodes = body
        .into_inner()
        .nodes
        .ok_or_else(|| NodeError::validation("please supply a valid list of nodes"))?;
    let total_nodes = state.register_nodes(&nodes)?;
    Ok(HttpResponse::Created().json(RegisterNodesResponse {
        message: "New nodes have been added".into(),
        total_nodes,
    }))
}

#[get("/nodes/")]
pub async fn get_nodes(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(NodesResponse {
        nodes: state.peers(),
    })
}
