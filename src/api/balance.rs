use actix_web::{HttpResponse, Responder, get, web};

use super::models::AppState;

#[get("/balances/")]
pub async fn get_balances(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.balances())
}

/// Unknown wallets report zero totals.
#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    HttpResponse::Ok().json(state.node.balance_of(&address))
}
