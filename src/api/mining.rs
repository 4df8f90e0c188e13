//! Endpoints that run a proof-of-work search. The search is CPU-bound, so
//! it runs on actix's blocking pool and never on a worker thread.

use actix_web::{HttpResponse, post, web};
use log::info;

use super::models::{AppState, ConfirmRequest, MineRawRequest};

/// Mine the given transactions as-is, without moving any balance.
#[post("/mine-raw/")]
pub async fn mine_raw(
    state: web::Data<AppState>,
    body: web::Json<MineRawRequest>,
) -> actix_web::Result<HttpResponse> {
    let node = state.node.clone();
    let transactions = body.into_inner().transactions;
    let block = web::block(move || node.build_candidate(transactions, false)).await??;
    info!("POST /mine-raw/ - mined block #{} ({})", block.index, block.hash);
    Ok(HttpResponse::Ok().json(block))
}

/// Fund-authority decision on a pending transaction.
#[post("/confirm/")]
pub async fn confirm(
    state: web::Data<AppState>,
    body: web::Json<ConfirmRequest>,
) -> actix_web::Result<HttpResponse> {
    let node = state.node.clone();
    let ConfirmRequest {
        id,
        signature,
        approve,
    } = body.into_inner();
    let block =
        web::block(move || node.confirm_pending_transaction(&id, &signature, approve)).await??;
    Ok(HttpResponse::Ok().json(block))
}
