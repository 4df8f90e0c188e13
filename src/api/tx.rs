use actix_web::{HttpResponse, get, post, web};
use log::debug;

use super::models::{AppState, NewTxRequest, WithdrawRequest, WithdrawResponse};
use crate::error::NodeError;
use crate::wallet::{address_from_public_key, create_transaction};

/// Build a single-item pending transaction and queue it.
#[post("/transactions/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> Result<HttpResponse, NodeError> {
    let req = body.into_inner();
    let wallet = match req.wallet {
        Some(wallet) => wallet,
        None => address_from_public_key(&req.wallet_key)?,
    };
    let tx = create_transaction(
        &wallet,
        &req.wallet_key,
        &req.wallet_owner,
        req.amount,
        req.month,
        req.year,
        req.kind,
    );
    debug!("POST /transactions/ - built id={} for {wallet}", tx.id);

    let tx = state.node.submit_transaction(tx)?;
    Ok(HttpResponse::Ok().json(tx))
}

/// Owner-signed removal of a pending transaction.
#[post("/transactions/withdraw/")]
pub async fn withdraw_transaction(
    state: web::Data<AppState>,
    body: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, NodeError> {
    state
        .node
        .withdraw_pending_transaction(&body.id, &body.signature)?;
    Ok(HttpResponse::Ok().json(WithdrawResponse {
        withdrawn: body.into_inner().id,
    }))
}

#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.node.mempool_snapshot())
}

#[get("/mempool/{address}/")]
pub async fn get_mempool_for_address(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.node.mempool_for_address(&path.into_inner().0))
}
