use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::node::{Node, PeerReply};
use crate::transaction::{Transaction, TxKind};

/// Shared application state: every handler goes through the node.
pub struct AppState {
    pub node: Arc<Node>,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub difficulty: u32,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub address: String,
    pub confirmed: Vec<Transaction>,
    pub pending: Vec<Transaction>,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct MineRawRequest {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub id: String,
    pub signature: String,
    pub approve: bool,
}

/* ---------- TX API Models ---------- */

/// A single line item to queue. `wallet` defaults to the address of
/// `wallet_key`.
#[derive(Deserialize)]
pub struct NewTxRequest {
    pub wallet: Option<String>,
    pub wallet_key: String,
    pub wallet_owner: String,
    pub amount: i64,
    pub month: u32,
    pub year: u32,
    pub kind: TxKind,
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub id: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct WithdrawResponse {
    pub withdrawn: String,
}

/* ---------- Peer API Models ---------- */

#[derive(Serialize)]
pub struct PeerResponse {
    pub result: PeerReply,
}

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub replaced: bool,
    pub length: usize,
}
