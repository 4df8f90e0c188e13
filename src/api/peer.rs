//! Inbound gossip from peers. Invalid input is rejected with a reason and
//! never affects the node beyond that.

use actix_web::{HttpResponse, post, web};

use super::models::{AppState, PeerResponse, ReplaceResponse};
use crate::blockchain::Block;
use crate::error::NodeError;
use crate::transaction::Transaction;

#[post("/peer/block/")]
pub async fn receive_block(
    state: web::Data<AppState>,
    body: web::Json<Block>,
) -> Result<HttpResponse, NodeError> {
    let result = state.node.on_received_block(body.into_inner())?;
    Ok(HttpResponse::Ok().json(PeerResponse { result }))
}

#[post("/peer/chain/")]
pub async fn receive_chain(
    state: web::Data<AppState>,
    body: web::Json<Vec<Block>>,
) -> Result<HttpResponse, NodeError> {
    state.node.on_received_chain(body.into_inner())?;
    Ok(HttpResponse::Ok().json(ReplaceResponse {
        replaced: true,
        length: state.node.stats().height,
    }))
}

#[post("/peer/transaction/")]
pub async fn receive_transaction(
    state: web::Data<AppState>,
    body: web::Json<Transaction>,
) -> Result<HttpResponse, NodeError> {
    let tx = body.into_inner();
    let id = tx.id.clone();
    state.node.on_received_transaction(tx)?;
    Ok(HttpResponse::Accepted().body(id))
}
