use std::collections::HashSet;

use log::debug;

use super::model::{LineItem, Transaction};
use crate::error::{NodeError, Result};
use crate::wallet::{FundAuthority, SignatureVerifier};

/// Addresses are base58 strings of this length...
pub const ADDRESS_LEN: usize = 34;
/// ...starting with the network prefix.
pub const ADDRESS_PREFIX: char = 'd';

/// Guard rails on line-item content that the network agrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Reject line items whose amount is zero or negative.
    pub require_positive_amounts: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_positive_amounts: true,
        }
    }
}

pub fn validate_address(address: &str) -> Result<()> {
    if address.len() != ADDRESS_LEN {
        return Err(NodeError::structural(format!(
            "address {address:?} must be {ADDRESS_LEN} characters long"
        )));
    }
    if !address.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(NodeError::structural(format!(
            "address {address:?} must contain only alphanumeric characters"
        )));
    }
    if !address.starts_with(ADDRESS_PREFIX) {
        return Err(NodeError::structural(format!(
            "address {address:?} must start with '{ADDRESS_PREFIX}'"
        )));
    }
    Ok(())
}

fn is_lower_hex(s: &str) -> bool {
    s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn validate_line_item_structure(item: &LineItem) -> Result<()> {
    validate_address(&item.wallet)?;
    if item.wallet_key.is_empty() || !item.wallet_key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NodeError::structural("wallet key must be a non-empty hex string"));
    }
    if !(1..=12).contains(&item.month) {
        return Err(NodeError::structural(format!(
            "month {} is outside 1..=12",
            item.month
        )));
    }
    Ok(())
}

/// Shape checks: well-formed ID, a non-empty line-item list and valid
/// addresses. Field types are already enforced by deserialization.
pub fn validate_structure(tx: &Transaction) -> Result<()> {
    if tx.id.len() != 64 || !is_lower_hex(&tx.id) {
        return Err(NodeError::structural(format!(
            "transaction id {:?} is not a sha256 hex digest",
            tx.id
        )));
    }
    if tx.line_items.is_empty() {
        return Err(NodeError::structural(format!(
            "transaction {} has no line items",
            tx.id
        )));
    }
    for item in &tx.line_items {
        validate_line_item_structure(item)?;
    }
    if !tx.signature.is_empty() && !tx.signature.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NodeError::structural("signature must be hex"));
    }
    Ok(())
}

fn validate_line_item(item: &LineItem, policy: ValidationPolicy) -> Result<()> {
    if policy.require_positive_amounts && item.amount <= 0 {
        return Err(NodeError::structural(format!(
            "{:?} amount must be positive, got {}",
            item.kind, item.amount
        )));
    }
    Ok(())
}

/// Structure, ID integrity and per-item checks.
pub fn validate_transaction(tx: &Transaction, policy: ValidationPolicy) -> Result<()> {
    validate_structure(tx)?;

    let derived = tx.derived_id();
    if derived != tx.id {
        return Err(NodeError::structural(format!(
            "invalid tx id {}, content hashes to {derived}",
            tx.id
        )));
    }

    for item in &tx.line_items {
        validate_line_item(item, policy)
            .map_err(|e| NodeError::structural(format!("line item in tx {}: {e}", tx.id)))?;
    }
    Ok(())
}

/// Validate the transaction set of the block at `index`.
///
/// Outside genesis every decided transaction must carry the fund
/// authority's signature over its ID, so the unsigned founding deposit
/// can only ever appear in block 0.
pub fn validate_block_transactions(
    txs: &[Transaction],
    index: u64,
    authority: &FundAuthority,
    verifier: &dyn SignatureVerifier,
    policy: ValidationPolicy,
) -> Result<()> {
    let mut seen = HashSet::with_capacity(txs.len());
    for tx in txs {
        validate_transaction(tx, policy)?;

        if !seen.insert(tx.id.as_str()) {
            return Err(NodeError::consensus(format!(
                "transaction {} appears twice in block {index}",
                tx.id
            )));
        }

        if index > 0
            && tx.is_approved.is_some()
            && !verifier.verify(&tx.id, &tx.signature, &authority.public_key)
        {
            debug!("block {index}: decided tx {} lacks authority signature", tx.id);
            return Err(NodeError::unauthorized(format!(
                "transaction {} in block {index} is decided without a valid authority signature",
                tx.id
            )));
        }
    }
    Ok(())
}
