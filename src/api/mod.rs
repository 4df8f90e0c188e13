mod balance;
mod chain;
mod health;
mod mining;
pub mod models;
mod peer;
mod stats;
mod tx;
mod wallet;

use actix_web::http::StatusCode;
use actix_web::web::{self, ServiceConfig};
use actix_web::ResponseError;

use crate::error::NodeError;

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blocks)
            .service(chain::get_latest_block)
            .service(chain::get_block)
            .service(chain::get_transaction)
            .service(chain::get_address)
            .service(chain::validate_chain)
            .service(mining::mine_raw)
            .service(mining::confirm)
            .service(balance::get_balances)
            .service(balance::get_balance)
            .service(tx::post_transaction)
            .service(tx::withdraw_transaction)
            .service(tx::get_mempool)
            .service(tx::get_mempool_for_address)
            .service(stats::get_stats)
            .service(wallet::create_wallet)
            .service(peer::receive_block)
            .service(peer::receive_chain)
            .service(peer::receive_transaction),
    );
}

/// Errors leave handlers as plain-text bodies with a status per kind.
impl ResponseError for NodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            NodeError::Structural(_) | NodeError::Consensus(_) => StatusCode::BAD_REQUEST,
            NodeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            NodeError::NotFound(_) => StatusCode::NOT_FOUND,
            NodeError::Conflict(_) => StatusCode::CONFLICT,
            NodeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
