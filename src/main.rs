mod api;
mod blockchain;
mod config;
mod consensus;
mod error;
mod mining;
mod network;
mod node;
mod transaction;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use api::AppState;
use config::NodeConfig;
use network::HttpClient;
use network::sync::spawn_background_tasks;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = match NodeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };
    let client = match HttpClient::new(config.http_timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    let (host, port) = (config.host.clone(), config.port);
    println!("⛓️ Starting ledger node {} at http://{host}:{port}", config.node_id);
    if let Some(manager) = &config.manager {
        info!("reporting solutions to manager {manager}");
    }

    let state = web::Data::new(AppState::new(config, client));
    let token = CancellationToken::new();
    let background = spawn_background_tasks(state.clone().into_inner(), token.clone());

    let server = HttpServer::new({
        let state = state.clone();
        move || {
            App::new()
                .app_data(state.clone())
                .configure(api::init_routes)
        }
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    token.cancel();
    state.abandon_open_round("node shutting down").await;
    for task in background {
        let _ = task.await;
    }
    server
}
