use serde::{Deserialize, Serialize};

use super::{
    GENESIS_FUND_DEPOSIT, GENESIS_MONTH, GENESIS_OWNER, GENESIS_TIMESTAMP, GENESIS_YEAR,
};
use crate::hashing::{content_hash, hash_satisfies_difficulty};
use crate::ledger::Balance;
use crate::transaction::{LineItem, Transaction, TxKind};
use crate::wallet::FundAuthority;

/// How many nonces are tried between two staleness checks.
const STALE_CHECK_INTERVAL: u64 = 4096;

/// A single block: its transactions plus the full balance snapshot they
/// produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: i64, // Unix timestamp (UTC)
    pub transactions: Vec<Transaction>,
    pub balances: Vec<Balance>,
    pub difficulty: u32,
    pub nonce: u64, // Proof-of-Work nonce
}

/// Every field of a block except the proof of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub balances: Vec<Balance>,
    pub difficulty: u32,
}

impl BlockTemplate {
    /// Canonical preimage up to (but excluding) the difficulty and nonce.
    fn preimage_prefix(&self) -> String {
        let txs: String = self.transactions.iter().map(Transaction::canonical).collect();
        let balances: String = self.balances.iter().map(Balance::canonical).collect();
        format!(
            "{}{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, txs, balances
        )
    }

    pub fn hash_with_nonce(&self, nonce: u64) -> String {
        hash_parts(&self.preimage_prefix(), self.difficulty, nonce)
    }

    fn seal(self, hash: String, nonce: u64) -> Block {
        Block {
            index: self.index,
            hash,
            previous_hash: self.previous_hash,
            timestamp: self.timestamp,
            transactions: self.transactions,
            balances: self.balances,
            difficulty: self.difficulty,
            nonce,
        }
    }

    /// Brute-force the nonce from 0 upwards until the hash satisfies the
    /// template's difficulty. Unbounded.
    #[cfg(test)]
    pub fn mine(self) -> Block {
        let prefix = self.preimage_prefix();
        let mut nonce: u64 = 0;
        loop {
            let hash = hash_parts(&prefix, self.difficulty, nonce);
            if hash_satisfies_difficulty(&hash, self.difficulty) {
                return self.seal(hash, nonce);
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Same search as [`BlockTemplate::mine`], giving up with `None` once
    /// `is_stale` reports that the template no longer extends the head.
    pub fn mine_until_stale(self, is_stale: impl Fn() -> bool) -> Option<Block> {
        let prefix = self.preimage_prefix();
        let mut nonce: u64 = 0;
        loop {
            if nonce % STALE_CHECK_INTERVAL == 0 && is_stale() {
                return None;
            }
            let hash = hash_parts(&prefix, self.difficulty, nonce);
            if hash_satisfies_difficulty(&hash, self.difficulty) {
                return Some(self.seal(hash, nonce));
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

fn hash_parts(prefix: &str, difficulty: u32, nonce: u64) -> String {
    content_hash(&[prefix, &difficulty.to_string(), &nonce.to_string()])
}

impl Block {
    /// The founding block, identical on every node sharing `authority`.
    pub fn genesis(authority: &FundAuthority) -> Self {
        let mut founding = Transaction::new(vec![LineItem {
            wallet: authority.address.clone(),
            wallet_key: authority.public_key.clone(),
            wallet_owner: GENESIS_OWNER.to_string(),
            amount: GENESIS_FUND_DEPOSIT,
            month: GENESIS_MONTH,
            year: GENESIS_YEAR,
            kind: TxKind::Deposit,
            timestamp: GENESIS_TIMESTAMP,
        }]);
        founding.is_approved = Some(true);

        let template = BlockTemplate {
            index: 0,
            previous_hash: String::new(),
            timestamp: GENESIS_TIMESTAMP,
            transactions: vec![founding],
            balances: vec![Balance::new(
                authority.address.clone(),
                GENESIS_FUND_DEPOSIT,
                0,
            )],
            difficulty: 0,
        };
        let hash = template.hash_with_nonce(0);
        template.seal(hash, 0)
    }

    /// Recompute the hash from every other field, including this block's
    /// own balance snapshot.
    pub fn compute_hash(&self) -> String {
        self.template().hash_with_nonce(self.nonce)
    }

    pub fn template(&self) -> BlockTemplate {
        BlockTemplate {
            index: self.index,
            previous_hash: self.previous_hash.clone(),
            timestamp: self.timestamp,
            transactions: self.transactions.clone(),
            balances: self.balances.clone(),
            difficulty: self.difficulty,
        }
    }

    /// Stored hash matches the content and meets the stated difficulty.
    /// (Does NOT validate chain linkage.)
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash() && hash_satisfies_difficulty(&self.hash, self.difficulty)
    }

    /// Proof-of-work weight of this block.
    pub fn work(&self) -> u128 {
        1u128.checked_shl(self.difficulty).unwrap_or(u128::MAX)
    }
}
