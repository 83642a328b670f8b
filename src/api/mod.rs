mod chain;
mod health;
mod mining;
pub mod models;
mod nodes;
mod tx;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::resolve)
            .service(tx::post_transaction)
            .service(tx::get_pending)
            .service(tx::generate_transactions)
            .service(nodes::register_nodes)
            .service(nodes::get_nodes)
            .service(mining::get_cluster)
            .service(mining::register_miners)
            .service(mining::start_cluster)
            .service(mining::report_block)
            .service(mining::start_mining)
            .service(mining::stop_mining)
            .service(mining::mining_status),
    );
}
