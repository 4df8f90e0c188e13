mod api;
mod blockchain;
mod config;
mod error;
mod hashing;
mod ledger;
mod node;
mod storage;
mod transaction;
mod wallet;

use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use config::Settings;
use node::{LogSink, Node};
use storage::ChainStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let settings = Settings::from_env().map_err(io::Error::other)?;
    let rules = settings.chain_rules();
    let node = match &settings.chain_file {
        Some(path) => Node::open(rules, ChainStore::new(path), Arc::new(LogSink))
            .map_err(io::Error::other)?,
        None => Node::new(rules, Arc::new(LogSink)),
    };

    let head = node.latest_block();
    info!(
        "fund authority {}, head #{} ({})",
        settings.authority.address, head.index, head.hash
    );
    info!(
        "starting ledger node API at http://{}:{}",
        settings.host, settings.port
    );

    let state = web::Data::new(AppState {
        node: Arc::new(node),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}
