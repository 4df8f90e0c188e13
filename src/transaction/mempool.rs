use std::collections::HashSet;

use log::debug;

use super::model::Transaction;
use super::validation::{ValidationPolicy, validate_transaction};
use crate::error::{NodeError, Result};

/// Pending transactions awaiting a decision by the fund authority.
/// Insertion order is kept so candidate selection is deterministic.
#[derive(Debug, Default, Clone)]
pub struct Mempool {
    txs: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self { txs: Vec::new() }
    }

    /// Validate and append a pending transaction.
    pub fn add(&mut self, tx: Transaction, policy: ValidationPolicy) -> Result<()> {
        validate_transaction(&tx, policy)?;
        if !tx.is_pending() {
            return Err(NodeError::structural(format!(
                "transaction {} is already decided",
                tx.id
            )));
        }
        if let Some(existing) = self.conflicting(&tx) {
            return Err(NodeError::structural(format!(
                "transaction {} duplicates pending transaction {}",
                tx.id, existing.id
            )));
        }
        debug!("adding to mempool: {}", tx.id);
        self.txs.push(tx);
        Ok(())
    }

    /// An existing entry with the same ID or the same line-item content
    /// (timestamps aside).
    fn conflicting(&self, tx: &Transaction) -> Option<&Transaction> {
        let keys: Vec<_> = tx.line_items.iter().map(|i| i.content_key()).collect();
        self.txs.iter().find(|pooled| {
            pooled.id == tx.id
                || pooled
                    .line_items
                    .iter()
                    .map(|i| i.content_key())
                    .eq(keys.iter().cloned())
        })
    }

    /// Remove by ID. Absent IDs are not an error.
    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        let pos = self.txs.iter().position(|t| t.id == id)?;
        debug!("removing from mempool: {id}");
        Some(self.txs.remove(pos))
    }

    /// Drop every entry confirmed by `confirmed`. Returns how many were
    /// removed; a second call with the same input removes nothing.
    pub fn reconcile(&mut self, confirmed: &[Transaction]) -> usize {
        let ids: HashSet<&str> = confirmed.iter().map(|t| t.id.as_str()).collect();
        let before = self.txs.len();
        self.txs.retain(|t| !ids.contains(t.id.as_str()));
        let removed = before - self.txs.len();
        if removed > 0 {
            debug!(
                "mempool reconciled: {before} -> {} (removed {removed})",
                self.txs.len()
            );
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Transaction> {
        self.txs.iter().find(|t| t.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.txs.iter().any(|t| t.id == id)
    }

    pub fn for_address(&self, address: &str) -> Vec<Transaction> {
        self.txs
            .iter()
            .filter(|t| t.owner_wallet() == Some(address))
            .cloned()
            .collect()
    }

    /// Copy of the pool in insertion order.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.txs.clone()
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}
