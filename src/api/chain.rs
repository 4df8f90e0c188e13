use actix_web::{HttpResponse, Responder, get, web};
use log::warn;

use super::models::{AddressResponse, AppState, ChainResponse, ValidateResponse};
use crate::error::NodeError;

/// Get the full blockchain.
#[get("/blocks/")]
pub async fn get_blocks(state: web::Data<AppState>) -> impl Responder {
    let chain = state.node.full_chain();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        difficulty: state.node.stats().next_difficulty,
        chain,
    })
}

#[get("/blocks/latest/")]
pub async fn get_latest_block(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.latest_block())
}

#[get("/block/{hash}/")]
pub async fn get_block(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, NodeError> {
    let hash = path.into_inner().0;
    let block = state
        .node
        .block_by_hash(&hash)
        .ok_or_else(|| NodeError::NotFound(format!("block {hash}")))?;
    Ok(HttpResponse::Ok().json(block))
}

/// Look up a confirmed transaction.
#[get("/transaction/{id}/")]
pub async fn get_transaction(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, NodeError> {
    let id = path.into_inner().0;
    let tx = state
        .node
        .transaction_by_id(&id)
        .ok_or_else(|| NodeError::NotFound(format!("transaction {id}")))?;
    Ok(HttpResponse::Ok().json(tx))
}

/// Confirmed and pending transactions touching an address.
#[get("/address/{address}/")]
pub async fn get_address(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    HttpResponse::Ok().json(AddressResponse {
        confirmed: state.node.transactions_for_address(&address),
        pending: state.node.mempool_for_address(&address),
        address,
    })
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let result = state.node.validate_local_chain();
    if let Err(e) = &result {
        warn!("local chain failed validation: {e}");
    }
    HttpResponse::Ok().json(ValidateResponse {
        valid: result.is_ok(),
        length: state.node.stats().height,
        reason: result.err().map(|e| e.to_string()),
    })
}
