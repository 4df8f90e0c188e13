use std::sync::Arc;

use log::{info, warn};

use super::validation::{accumulated_work, difficulty_for, validate_new_block};
use super::{Block, BlockTemplate};
use crate::error::{NodeError, Result};
use crate::ledger::{Balance, LedgerPolicy, balance_of, project_balances};
use crate::transaction::{Transaction, ValidationPolicy, validate_block_transactions};
use crate::wallet::{FundAuthority, Secp256k1Verifier, SignatureVerifier};

/// Everything a node needs to agree with its peers on validity.
#[derive(Clone)]
pub struct ChainRules {
    pub authority: FundAuthority,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub tx_policy: ValidationPolicy,
    pub ledger_policy: LedgerPolicy,
}

impl ChainRules {
    pub fn new(authority: FundAuthority) -> Self {
        Self {
            authority,
            verifier: Arc::new(Secp256k1Verifier),
            tx_policy: ValidationPolicy::default(),
            ledger_policy: LedgerPolicy::default(),
        }
    }

    pub fn genesis(&self) -> Block {
        Block::genesis(&self.authority)
    }

    pub fn validate_block_transactions(&self, block: &Block) -> Result<()> {
        validate_block_transactions(
            &block.transactions,
            block.index,
            &self.authority,
            self.verifier.as_ref(),
            self.tx_policy,
        )
    }

    /// `block` must carry exactly the snapshot its approved transactions
    /// produce on top of `previous`.
    pub fn validate_block_balances(&self, block: &Block, previous: &Block) -> Result<()> {
        let expected = project_balances(
            &previous.balances,
            &block.transactions,
            &self.authority.address,
            self.ledger_policy,
        )?;
        if block.balances != expected {
            return Err(NodeError::consensus(format!(
                "balances of block {} do not follow from its transactions",
                block.index
            )));
        }
        Ok(())
    }

    /// Genesis equality, pairwise linkage/hash rules, every block's
    /// transaction set and balance snapshot.
    pub fn validate_chain(&self, chain: &[Block]) -> Result<()> {
        let Some(first) = chain.first() else {
            return Err(NodeError::structural("chain is empty"));
        };
        if *first != self.genesis() {
            return Err(NodeError::consensus("genesis block does not match"));
        }
        for pair in chain.windows(2) {
            validate_new_block(&pair[1], &pair[0])?;
        }
        for block in chain {
            self.validate_block_transactions(block)?;
        }
        for pair in chain.windows(2) {
            self.validate_block_balances(&pair[1], &pair[0])?;
        }
        Ok(())
    }
}

/// In-memory chain. Mutated only through [`Blockchain::append_block`]
/// and [`Blockchain::replace_chain`], both of which validate first.
pub struct Blockchain {
    chain: Vec<Block>,
    rules: ChainRules,
}

impl Blockchain {
    /// Initialize a new blockchain with the genesis block.
    pub fn new(rules: ChainRules) -> Self {
        Self {
            chain: vec![rules.genesis()],
            rules,
        }
    }

    /// Adopt a previously stored chain after full validation.
    pub fn from_blocks(rules: ChainRules, blocks: Vec<Block>) -> Result<Self> {
        rules.validate_chain(&blocks)?;
        Ok(Self {
            chain: blocks,
            rules,
        })
    }

    pub fn rules(&self) -> &ChainRules {
        &self.rules
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Difficulty the next block must be mined at.
    pub fn difficulty(&self) -> u32 {
        difficulty_for(&self.chain)
    }

    pub fn accumulated_work(&self) -> u128 {
        accumulated_work(&self.chain)
    }

    pub fn balances(&self) -> &[Balance] {
        &self.last_block().balances
    }

    pub fn balance_of(&self, wallet: &str) -> Balance {
        balance_of(self.balances(), wallet)
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|b| b.hash == hash)
    }

    pub fn transaction_by_id(&self, id: &str) -> Option<&Transaction> {
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .find(|t| t.id == id)
    }

    /// Confirmed transactions owned by `address`, oldest first.
    pub fn transactions_for_address(&self, address: &str) -> Vec<Transaction> {
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|t| t.owner_wallet() == Some(address))
            .cloned()
            .collect()
    }

    /// Everything needed to mine the block that would follow the head.
    ///
    /// Only approved transactions move balances, and those may only be
    /// mined with `approve` set; a raw block carries the head's snapshot
    /// forward unchanged.
    pub fn build_template(
        &self,
        transactions: Vec<Transaction>,
        approve: bool,
        timestamp: i64,
    ) -> Result<BlockTemplate> {
        let previous = self.last_block();
        let index = previous.index + 1;

        validate_block_transactions(
            &transactions,
            index,
            &self.rules.authority,
            self.rules.verifier.as_ref(),
            self.rules.tx_policy,
        )?;
        if let Some(tx) = transactions
            .iter()
            .find(|tx| self.transaction_by_id(&tx.id).is_some())
        {
            return Err(NodeError::consensus(format!(
                "transaction {} is already confirmed",
                tx.id
            )));
        }

        if !approve {
            if let Some(tx) = transactions.iter().find(|tx| tx.is_approved == Some(true)) {
                return Err(NodeError::structural(format!(
                    "transaction {} is approved and cannot be mined raw",
                    tx.id
                )));
            }
        }
        let balances = project_balances(
            &previous.balances,
            &transactions,
            &self.rules.authority.address,
            self.rules.ledger_policy,
        )?;

        Ok(BlockTemplate {
            index,
            previous_hash: previous.hash.clone(),
            timestamp,
            transactions,
            balances,
            difficulty: self.difficulty(),
        })
    }

    /// Append a block that directly extends the head. A block built on an
    /// older block of this chain is reported as a retryable conflict.
    pub fn append_block(&mut self, block: Block) -> Result<()> {
        let head = self.last_block();
        if block.previous_hash != head.hash && self.block_by_hash(&block.previous_hash).is_some() {
            return Err(NodeError::Conflict(format!(
                "block {} was built on {}, head is now {}",
                block.index, block.previous_hash, head.hash
            )));
        }
        validate_new_block(&block, head)?;
        self.rules.validate_block_transactions(&block)?;
        self.rules.validate_block_balances(&block, head)?;
        info!(
            "appended block #{} (hash={}, difficulty={}, nonce={})",
            block.index, block.hash, block.difficulty, block.nonce
        );
        self.chain.push(block);
        Ok(())
    }

    /// Swap in `candidate` iff it is valid and carries strictly more
    /// accumulated work than the local chain.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        if let Err(e) = self.rules.validate_chain(&candidate) {
            warn!("received chain invalid: {e}");
            return Err(e);
        }
        let theirs = accumulated_work(&candidate);
        let ours = self.accumulated_work();
        if theirs <= ours {
            return Err(NodeError::consensus(format!(
                "received chain work {theirs} does not exceed local work {ours}"
            )));
        }
        info!(
            "replacing chain: {} blocks (work {ours}) -> {} blocks (work {theirs})",
            self.chain.len(),
            candidate.len()
        );
        self.chain = candidate;
        Ok(())
    }
}
