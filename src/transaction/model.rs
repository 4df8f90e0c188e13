use serde::{Deserialize, Serialize};

use crate::hashing::content_hash;

/// Kind of financial instruction carried by a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    Deposit,
    Withdraw,
    Lend,
    Pay,
}

impl TxKind {
    /// Numeric code used inside hashes and transaction IDs.
    pub fn code(self) -> u8 {
        match self {
            TxKind::Deposit => 0,
            TxKind::Withdraw => 1,
            TxKind::Lend => 2,
            TxKind::Pay => 3,
        }
    }
}

/// A single financial instruction against one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub wallet: String,
    /// Hex-encoded secp256k1 public key of `wallet`.
    pub wallet_key: String,
    pub wallet_owner: String,
    pub amount: i64,
    pub month: u32,
    pub year: u32,
    pub kind: TxKind,
    pub timestamp: i64, // Unix timestamp (UTC)
}

impl LineItem {
    /// Canonical rendering used for ID derivation.
    pub fn canonical(&self) -> String {
        format!(
            "{}{}{}{}{}{}{}{}",
            self.wallet,
            self.wallet_key,
            self.wallet_owner,
            self.amount,
            self.month,
            self.year,
            self.kind.code(),
            self.timestamp
        )
    }

    /// Same fields as `canonical` minus the timestamp; two pending
    /// transactions with equal content keys are duplicates.
    pub fn content_key(&self) -> (&str, &str, &str, i64, u32, u32, TxKind) {
        (
            &self.wallet,
            &self.wallet_key,
            &self.wallet_owner,
            self.amount,
            self.month,
            self.year,
            self.kind,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Content hash over `line_items` only.
    pub id: String,
    pub line_items: Vec<LineItem>,
    /// `None` while pending, `Some(true|false)` once the fund authority decided.
    pub is_approved: Option<bool>,
    /// Hex DER signature of the fund authority over `id`; empty until decided.
    pub signature: String,
}

impl Transaction {
    /// Build a pending, unsigned transaction and derive its ID.
    pub fn new(line_items: Vec<LineItem>) -> Self {
        let id = derive_transaction_id(&line_items);
        Self {
            id,
            line_items,
            is_approved: None,
            signature: String::new(),
        }
    }

    /// ID recomputed from the current line items.
    pub fn derived_id(&self) -> String {
        derive_transaction_id(&self.line_items)
    }

    /// Wallet of the first line item, which owns the transaction.
    pub fn owner_wallet(&self) -> Option<&str> {
        self.line_items.first().map(|item| item.wallet.as_str())
    }

    pub fn is_pending(&self) -> bool {
        self.is_approved.is_none()
    }

    /// Canonical rendering used inside block hashes.
    pub fn canonical(&self) -> String {
        let approval = match self.is_approved {
            None => "null",
            Some(true) => "true",
            Some(false) => "false",
        };
        let items: String = self.line_items.iter().map(LineItem::canonical).collect();
        format!("{}{}{}{}", self.id, items, approval, self.signature)
    }
}

/// Hash of the concatenated canonical line items. Approval and signature
/// never enter the ID.
pub fn derive_transaction_id(line_items: &[LineItem]) -> String {
    let rendered: Vec<String> = line_items.iter().map(LineItem::canonical).collect();
    let parts: Vec<&str> = rendered.iter().map(String::as_str).collect();
    content_hash(&parts)
}
