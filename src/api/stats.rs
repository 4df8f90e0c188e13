use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;

use super::models::AppState;
use crate::blockchain::{BLOCK_GENERATION_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL};
use crate::node::NodeStats;

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    node: NodeStats,
    target_block_time_secs: i64,
    adjust_interval: u64,
}

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(StatsResponse {
        node: state.node.stats(),
        target_block_time_secs: BLOCK_GENERATION_INTERVAL_SECS,
        adjust_interval: DIFFICULTY_ADJUSTMENT_INTERVAL,
    })
}
