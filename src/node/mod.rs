//! Node façade: the only place where the chain and the mempool change.
//!
//! Chain mutations (append and replace) are serialized behind one write
//! lock and reconcile the mempool before the lock is released. Mining
//! runs without any lock held and hands its block back to the same
//! commit path, which rejects it if the head moved in the meantime.

pub mod events;

pub use events::{EventSink, LogSink, NodeEvent};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::blockchain::{Block, Blockchain, ChainRules};
use crate::error::{NodeError, Result};
use crate::ledger::Balance;
use crate::storage::ChainStore;
use crate::transaction::{Mempool, Transaction};

/// Outcome of a block received from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerReply {
    Appended,
    /// Not ahead of the local head; nothing to do.
    Ignored,
    /// Ahead of the local head but not its direct child: the peer should
    /// send its full chain.
    NeedFullChain,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub height: usize,
    pub head_hash: String,
    pub next_difficulty: u32,
    pub accumulated_work: u128,
    /// Seconds between the last two blocks, once there are two.
    pub last_block_interval_secs: Option<i64>,
    pub mempool_size: usize,
}

pub struct Node {
    chain: RwLock<Blockchain>,
    mempool: Mutex<Mempool>,
    /// Bumped on every chain mutation; lets in-flight mining notice a
    /// moved head.
    head_version: AtomicU64,
    store: Option<ChainStore>,
    events: Arc<dyn EventSink>,
}

impl Node {
    pub fn new(rules: ChainRules, events: Arc<dyn EventSink>) -> Self {
        Self::with_chain(Blockchain::new(rules), None, events)
    }

    /// Start from the snapshot in `store` if there is one, otherwise from
    /// genesis. A stored chain that fails validation is an error.
    pub fn open(rules: ChainRules, store: ChainStore, events: Arc<dyn EventSink>) -> Result<Self> {
        let chain = match store.load()? {
            Some(blocks) => {
                let chain = Blockchain::from_blocks(rules, blocks)?;
                info!(
                    "restored {} blocks from {}",
                    chain.len(),
                    store.path().display()
                );
                chain
            }
            None => Blockchain::new(rules),
        };
        Ok(Self::with_chain(chain, Some(store), events))
    }

    fn with_chain(chain: Blockchain, store: Option<ChainStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            chain: RwLock::new(chain),
            mempool: Mutex::new(Mempool::new()),
            head_version: AtomicU64::new(0),
            store,
            events,
        }
    }

    fn read_chain(&self) -> RwLockReadGuard<'_, Blockchain> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_chain(&self) -> RwLockWriteGuard<'_, Blockchain> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mempool(&self) -> MutexGuard<'_, Mempool> {
        self.mempool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /* -------------------- Reads -------------------- */

    pub fn latest_block(&self) -> Block {
        self.read_chain().last_block().clone()
    }

    pub fn full_chain(&self) -> Vec<Block> {
        self.read_chain().blocks().to_vec()
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<Block> {
        self.read_chain().block_by_hash(hash).cloned()
    }

    pub fn transaction_by_id(&self, id: &str) -> Option<Transaction> {
        self.read_chain().transaction_by_id(id).cloned()
    }

    pub fn transactions_for_address(&self, address: &str) -> Vec<Transaction> {
        self.read_chain().transactions_for_address(address)
    }

    pub fn balances(&self) -> Vec<Balance> {
        self.read_chain().balances().to_vec()
    }

    pub fn balance_of(&self, address: &str) -> Balance {
        self.read_chain().balance_of(address)
    }

    pub fn mempool_snapshot(&self) -> Vec<Transaction> {
        self.lock_mempool().snapshot()
    }

    pub fn mempool_for_address(&self, address: &str) -> Vec<Transaction> {
        self.lock_mempool().for_address(address)
    }

    /// Re-run full validation over the local chain.
    pub fn validate_local_chain(&self) -> Result<()> {
        let chain = self.read_chain();
        chain.rules().validate_chain(chain.blocks())
    }

    pub fn stats(&self) -> NodeStats {
        let mut stats = {
            let chain = self.read_chain();
            let last_block_interval_secs = match chain.blocks() {
                [.., older, newer] => Some((newer.timestamp - older.timestamp).max(0)),
                _ => None,
            };
            NodeStats {
                height: chain.len(),
                head_hash: chain.last_block().hash.clone(),
                next_difficulty: chain.difficulty(),
                accumulated_work: chain.accumulated_work(),
                last_block_interval_secs,
                mempool_size: 0,
            }
        };
        stats.mempool_size = self.lock_mempool().len();
        stats
    }

    /* -------------------- Mempool -------------------- */

    /// Validate and queue a pending transaction, then announce the pool.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<Transaction> {
        let snapshot = {
            let chain = self.read_chain();
            if chain.transaction_by_id(&tx.id).is_some() {
                return Err(NodeError::structural(format!(
                    "transaction {} is already confirmed",
                    tx.id
                )));
            }
            let mut pool = self.lock_mempool();
            pool.add(tx.clone(), chain.rules().tx_policy)?;
            pool.snapshot()
        };
        debug!("transaction {} accepted into mempool", tx.id);
        self.events.publish(NodeEvent::MempoolChanged(snapshot));
        Ok(tx)
    }

    /// Remove a pending transaction at its owner's request. The signature
    /// must verify against the wallet key of the transaction's first line
    /// item, not the fund authority.
    pub fn withdraw_pending_transaction(&self, tx_id: &str, signature: &str) -> Result<()> {
        let verifier = self.read_chain().rules().verifier.clone();
        let snapshot = {
            let mut pool = self.lock_mempool();
            let tx = pool
                .get(tx_id)
                .ok_or_else(|| NodeError::NotFound(format!("pending transaction {tx_id}")))?;
            let owner_key = tx
                .line_items
                .first()
                .map(|item| item.wallet_key.as_str())
                .unwrap_or_default();
            if !verifier.verify(tx_id, signature, owner_key) {
                warn!("withdrawal of {tx_id} rejected: signature does not match owner key");
                return Err(NodeError::unauthorized(format!(
                    "signature does not match the owner of {tx_id}"
                )));
            }
            pool.remove(tx_id);
            pool.snapshot()
        };
        info!("transaction {tx_id} withdrawn by its owner");
        self.events.publish(NodeEvent::MempoolChanged(snapshot));
        Ok(())
    }

    /* -------------------- Chain mutations -------------------- */

    /// Mine `transactions` into the block following the current head and
    /// append it. Balances move only when `approve` is set.
    ///
    /// Blocks the calling thread for the whole proof-of-work search; run
    /// it off any request-serving thread.
    pub fn build_candidate(&self, transactions: Vec<Transaction>, approve: bool) -> Result<Block> {
        self.mine_and_commit(transactions, approve, &[])
    }

    /// `still_pending` lists mempool ids the block settles; the commit is
    /// refused if any of them left the mempool during the search.
    fn mine_and_commit(
        &self,
        transactions: Vec<Transaction>,
        approve: bool,
        still_pending: &[&str],
    ) -> Result<Block> {
        let (template, version) = {
            let chain = self.read_chain();
            let version = self.head_version.load(Ordering::SeqCst);
            let template =
                chain.build_template(transactions, approve, Utc::now().timestamp())?;
            (template, version)
        };
        debug!(
            "mining block #{} at difficulty {} with {} txs",
            template.index,
            template.difficulty,
            template.transactions.len()
        );

        let block = template
            .mine_until_stale(|| self.head_version.load(Ordering::SeqCst) != version)
            .ok_or_else(|| {
                NodeError::Conflict("chain head moved while mining; retry".to_string())
            })?;

        self.commit_block(block.clone(), still_pending)?;
        Ok(block)
    }

    /// Approve or reject a pending transaction on behalf of the fund
    /// authority and mine it into a block. Nothing changes on failure.
    pub fn confirm_pending_transaction(
        &self,
        tx_id: &str,
        signature: &str,
        approve: bool,
    ) -> Result<Block> {
        let mut tx = self
            .lock_mempool()
            .get(tx_id)
            .ok_or_else(|| NodeError::NotFound(format!("pending transaction {tx_id}")))?;

        let (verifier, authority_key) = {
            let chain = self.read_chain();
            let rules = chain.rules();
            (rules.verifier.clone(), rules.authority.public_key.clone())
        };
        if !verifier.verify(tx_id, signature, &authority_key) {
            warn!("confirmation of {tx_id} rejected: signature does not match fund authority");
            return Err(NodeError::unauthorized(format!(
                "signature over {tx_id} is not the fund authority's"
            )));
        }

        tx.signature = signature.to_string();
        tx.is_approved = Some(approve);
        let block = self.mine_and_commit(vec![tx], approve, &[tx_id])?;
        info!(
            "transaction {tx_id} {} in block #{}",
            if approve { "approved" } else { "rejected" },
            block.index
        );
        Ok(block)
    }

    /// Append, reconcile the mempool, persist, then notify.
    fn commit_block(&self, block: Block, still_pending: &[&str]) -> Result<()> {
        let (removed, snapshot) = {
            let mut chain = self.write_chain();
            let mut pool = self.lock_mempool();
            if let Some(gone) = still_pending.iter().find(|id| !pool.contains(id)) {
                warn!("block #{} dropped: transaction {gone} left the mempool", block.index);
                return Err(NodeError::Conflict(format!(
                    "transaction {gone} is no longer pending"
                )));
            }
            chain.append_block(block.clone())?;
            self.head_version.fetch_add(1, Ordering::SeqCst);
            let removed = pool.reconcile(&block.transactions);
            self.persist(&chain);
            (removed, pool.snapshot())
        };
        self.events.publish(NodeEvent::ChainAdvanced(block));
        if removed > 0 {
            self.events.publish(NodeEvent::MempoolChanged(snapshot));
        }
        Ok(())
    }

    fn persist(&self, chain: &Blockchain) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(chain.blocks()) {
                warn!("could not persist chain to {}: {e}", store.path().display());
            }
        }
    }

    /* -------------------- Peer input -------------------- */

    /// A peer announced its latest block.
    pub fn on_received_block(&self, block: Block) -> Result<PeerReply> {
        let head = self.latest_block();
        if block.index <= head.index {
            debug!(
                "received block #{} is not ahead of local head #{}",
                block.index, head.index
            );
            return Ok(PeerReply::Ignored);
        }
        if block.previous_hash != head.hash {
            info!(
                "received block #{} does not extend local head #{}; need full chain",
                block.index, head.index
            );
            return Ok(PeerReply::NeedFullChain);
        }
        if let Err(e) = self.commit_block(block, &[]) {
            warn!("received block rejected: {e}");
            return Err(e);
        }
        Ok(PeerReply::Appended)
    }

    /// A peer sent its whole chain; adopt it if it is valid and heavier.
    pub fn on_received_chain(&self, candidate: Vec<Block>) -> Result<()> {
        let (length, head, removed, snapshot) = {
            let mut chain = self.write_chain();
            chain.replace_chain(candidate)?;
            self.head_version.fetch_add(1, Ordering::SeqCst);
            let confirmed: Vec<Transaction> = chain
                .blocks()
                .iter()
                .flat_map(|b| b.transactions.iter().cloned())
                .collect();
            let mut pool = self.lock_mempool();
            let removed = pool.reconcile(&confirmed);
            self.persist(&chain);
            (
                chain.len(),
                chain.last_block().clone(),
                removed,
                pool.snapshot(),
            )
        };
        self.events.publish(NodeEvent::ChainReplaced { length, head });
        if removed > 0 {
            self.events.publish(NodeEvent::MempoolChanged(snapshot));
        }
        Ok(())
    }

    /// A peer gossiped a pending transaction.
    pub fn on_received_transaction(&self, tx: Transaction) -> Result<()> {
        let id = tx.id.clone();
        if self.lock_mempool().contains(&id) {
            debug!("received transaction {id} is already pending");
            return Ok(());
        }
        self.submit_transaction(tx).map(|_| ()).inspect_err(|e| {
            debug!("dropping received transaction {id}: {e}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::events::RecordingSink;
    use super::*;
    use crate::blockchain::BlockTemplate;
    use crate::ledger::{LedgerPolicy, balance_of, project_balances};
    use crate::transaction::TxKind;
    use crate::wallet::{TestKeys, create_transaction};

    struct Fixture {
        fund: TestKeys,
        user: TestKeys,
        sink: Arc<RecordingSink>,
        node: Node,
    }

    fn fixture() -> Fixture {
        let fund = TestKeys::generate();
        let sink = Arc::new(RecordingSink::default());
        let node = Node::new(ChainRules::new(fund.authority()), sink.clone());
        Fixture {
            fund,
            user: TestKeys::generate(),
            sink,
            node,
        }
    }

    fn deposit(user: &TestKeys, amount: i64) -> Transaction {
        create_transaction(
            &user.address,
            &user.public_key,
            "Dana",
            amount,
            6,
            2025,
            TxKind::Deposit,
        )
    }

    #[test]
    fn deposit_confirmed_by_fund_updates_balances_and_clears_mempool() {
        let f = fixture();
        assert_eq!(f.node.balance_of(&f.fund.address).deposit, 300);

        let tx = f.node.submit_transaction(deposit(&f.user, 50)).unwrap();
        assert_eq!(f.node.mempool_snapshot(), vec![tx.clone()]);

        let block = f
            .node
            .confirm_pending_transaction(&tx.id, &f.fund.sign(&tx.id), true)
            .unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(f.node.balance_of(&f.user.address).deposit, 50);
        assert_eq!(f.node.balance_of(&f.fund.address).deposit, 350);
        assert!(f.node.mempool_snapshot().is_empty());

        let confirmed = f.node.transaction_by_id(&tx.id).unwrap();
        assert_eq!(confirmed.is_approved, Some(true));
        assert_eq!(confirmed.id, tx.id);
        assert!(f.node.validate_local_chain().is_ok());

        let events = f.sink.take();
        assert!(matches!(events[0], NodeEvent::MempoolChanged(ref txs) if txs.len() == 1));
        assert_eq!(events[1], NodeEvent::ChainAdvanced(block));
        assert_eq!(events[2], NodeEvent::MempoolChanged(vec![]));
    }

    #[test]
    fn rejection_is_mined_without_moving_balances() {
        let f = fixture();
        let tx = f.node.submit_transaction(deposit(&f.user, 50)).unwrap();
        let block = f
            .node
            .confirm_pending_transaction(&tx.id, &f.fund.sign(&tx.id), false)
            .unwrap();
        assert_eq!(block.transactions[0].is_approved, Some(false));
        assert_eq!(block.balances, f.node.full_chain()[0].balances);
        assert!(f.node.mempool_snapshot().is_empty());
    }

    #[test]
    fn confirmation_with_wrong_key_changes_nothing() {
        let f = fixture();
        let tx = f.node.submit_transaction(deposit(&f.user, 50)).unwrap();
        f.sink.take();

        let err = f
            .node
            .confirm_pending_transaction(&tx.id, &f.user.sign(&tx.id), true)
            .unwrap_err();
        assert!(matches!(err, NodeError::Unauthorized(_)));
        assert_eq!(f.node.full_chain().len(), 1);
        assert_eq!(f.node.mempool_snapshot(), vec![tx]);
        assert!(f.sink.take().is_empty());

        let missing = f
            .node
            .confirm_pending_transaction(&"ab".repeat(32), "30", true)
            .unwrap_err();
        assert!(matches!(missing, NodeError::NotFound(_)));
    }

    #[test]
    fn overdraft_confirmation_fails_atomically() {
        let f = fixture();
        let mut withdraw = deposit(&f.user, 10);
        withdraw.line_items[0].kind = TxKind::Withdraw;
        let withdraw = Transaction::new(withdraw.line_items);
        f.node.submit_transaction(withdraw.clone()).unwrap();

        let err = f
            .node
            .confirm_pending_transaction(&withdraw.id, &f.fund.sign(&withdraw.id), true)
            .unwrap_err();
        assert!(matches!(err, NodeError::Consensus(_)));
        assert_eq!(f.node.full_chain().len(), 1);
        assert_eq!(f.node.mempool_snapshot(), vec![withdraw]);
    }

    #[test]
    fn owner_can_withdraw_pending_transaction() {
        let f = fixture();
        let tx = f.node.submit_transaction(deposit(&f.user, 5)).unwrap();

        // the fund authority is not the owner
        let err = f
            .node
            .withdraw_pending_transaction(&tx.id, &f.fund.sign(&tx.id))
            .unwrap_err();
        assert!(matches!(err, NodeError::Unauthorized(_)));
        assert_eq!(f.node.mempool_snapshot().len(), 1);

        f.node
            .withdraw_pending_transaction(&tx.id, &f.user.sign(&tx.id))
            .unwrap();
        assert!(f.node.mempool_snapshot().is_empty());
        assert_eq!(f.node.full_chain().len(), 1);
        assert!(f.node.withdraw_pending_transaction(&tx.id, "00").is_err());
    }

    #[test]
    fn raw_mining_carries_balances_forward() {
        let f = fixture();
        let tx = deposit(&f.user, 70);
        let block = f.node.build_candidate(vec![tx.clone()], false).unwrap();
        assert_eq!(block.transactions, vec![tx.clone()]);
        assert_eq!(f.node.balances(), f.node.full_chain()[0].balances);

        // a confirmed transaction cannot be mined or queued again
        assert!(f.node.build_candidate(vec![tx.clone()], false).is_err());
        assert!(f.node.submit_transaction(tx).is_err());
    }

    #[test]
    fn stats_track_height_work_and_mempool() {
        let f = fixture();
        let stats = f.node.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.accumulated_work, 1);
        assert_eq!(stats.last_block_interval_secs, None);

        f.node.submit_transaction(deposit(&f.user, 1)).unwrap();
        let block = f.node.build_candidate(vec![], false).unwrap();
        let stats = f.node.stats();
        assert_eq!(stats.height, 2);
        assert_eq!(stats.head_hash, block.hash);
        assert_eq!(stats.mempool_size, 1);
        assert!(stats.last_block_interval_secs.is_some());
    }

    #[test]
    fn stale_candidate_is_a_retryable_conflict() {
        let f = fixture();
        let template = f
            .node
            .read_chain()
            .build_template(vec![], false, Utc::now().timestamp())
            .unwrap();
        f.node.build_candidate(vec![], false).unwrap();

        let err = f.node.commit_block(template.mine(), &[]).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.node.full_chain().len(), 2);
    }

    fn mine_on(previous: &Block, difficulty: u32) -> Block {
        BlockTemplate {
            index: previous.index + 1,
            previous_hash: previous.hash.clone(),
            timestamp: Utc::now().timestamp(),
            transactions: vec![],
            balances: previous.balances.clone(),
            difficulty,
        }
        .mine()
    }

    #[test]
    fn received_blocks_are_appended_ignored_or_escalated() {
        let f = fixture();
        let genesis = f.node.latest_block();
        let b1 = mine_on(&genesis, 1);
        let b2 = mine_on(&b1, 1);

        assert_eq!(f.node.on_received_block(b2.clone()).unwrap(), PeerReply::NeedFullChain);
        assert_eq!(f.node.on_received_block(b1.clone()).unwrap(), PeerReply::Appended);
        assert_eq!(f.node.on_received_block(b1).unwrap(), PeerReply::Ignored);
        assert_eq!(f.node.on_received_block(b2.clone()).unwrap(), PeerReply::Appended);
        assert_eq!(f.node.latest_block(), b2);

        let mut forged = mine_on(&b2, 1);
        forged.nonce += 1;
        assert!(f.node.on_received_block(forged).is_err());
    }

    #[test]
    fn heavier_received_chain_replaces_and_reconciles_mempool() {
        let f = fixture();
        let genesis = f.node.latest_block();
        let pending = f.node.submit_transaction(deposit(&f.user, 50)).unwrap();
        f.node.build_candidate(vec![], false).unwrap();
        f.sink.take();

        // the rival chain confirms the pending transaction
        let mut approved = pending.clone();
        approved.is_approved = Some(true);
        approved.signature = f.fund.sign(&pending.id);
        let mut b1 = mine_on(&genesis, 2).template();
        b1.transactions = vec![approved];
        b1.balances = project_balances(
            &genesis.balances,
            &b1.transactions,
            &f.fund.address,
            LedgerPolicy::default(),
        )
        .unwrap();
        let b1 = b1.mine();
        assert_eq!(balance_of(&b1.balances, &f.user.address).deposit, 50);
        let b2 = mine_on(&b1, 2);
        let rival = vec![genesis, b1, b2.clone()];

        f.node.on_received_chain(rival.clone()).unwrap();
        assert_eq!(f.node.full_chain(), rival);
        assert!(f.node.mempool_snapshot().is_empty());

        let events = f.sink.take();
        assert_eq!(events[0], NodeEvent::ChainReplaced { length: 3, head: b2 });
        assert_eq!(events[1], NodeEvent::MempoolChanged(vec![]));

        // equal work is not enough
        assert!(f.node.on_received_chain(rival).is_err());
        assert!(f.sink.take().is_empty());
    }

    #[test]
    fn received_blocks_and_chains_with_forged_balances_are_rejected() {
        let f = fixture();
        let genesis = f.node.latest_block();

        let mut forged = mine_on(&genesis, 0).template();
        forged.balances = vec![
            Balance::new(f.fund.address.clone(), 1_000_000, 0),
            Balance::new(f.user.address.clone(), -500, 0),
        ];
        let forged = forged.mine();

        let err = f.node.on_received_block(forged.clone()).unwrap_err();
        assert!(matches!(err, NodeError::Consensus(_)));
        assert_eq!(f.node.full_chain(), vec![genesis.clone()]);
        assert_eq!(f.node.balance_of(&f.fund.address).deposit, 300);

        let heavy = vec![genesis.clone(), forged.clone(), mine_on(&forged, 3)];
        let err = f.node.on_received_chain(heavy).unwrap_err();
        assert!(matches!(err, NodeError::Consensus(_)));
        assert_eq!(f.node.full_chain(), vec![genesis]);
        assert!(f.sink.take().is_empty());
    }

    #[test]
    fn withdrawal_during_confirmation_mining_wins() {
        let f = fixture();
        let mut tx = f.node.submit_transaction(deposit(&f.user, 50)).unwrap();
        tx.is_approved = Some(true);
        tx.signature = f.fund.sign(&tx.id);
        let block = f
            .node
            .read_chain()
            .build_template(vec![tx.clone()], true, Utc::now().timestamp())
            .unwrap()
            .mine();

        // the owner pulls the transaction while the block is being mined
        f.node
            .withdraw_pending_transaction(&tx.id, &f.user.sign(&tx.id))
            .unwrap();

        let err = f.node.commit_block(block, &[tx.id.as_str()]).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.node.full_chain().len(), 1);
        assert_eq!(f.node.balance_of(&f.user.address).deposit, 0);
        assert!(f.node.transaction_by_id(&tx.id).is_none());
    }

    #[test]
    fn received_garbage_transactions_are_dropped() {
        let f = fixture();
        let mut tx = deposit(&f.user, 5);
        tx.id = "00".repeat(32);
        assert!(f.node.on_received_transaction(tx).is_err());
        assert!(f.node.mempool_snapshot().is_empty());
        let tx = deposit(&f.user, 6);
        assert!(f.node.on_received_transaction(tx.clone()).is_ok());
        f.sink.take();
        // gossip echo of a known transaction is a no-op
        assert!(f.node.on_received_transaction(tx).is_ok());
        assert!(f.sink.take().is_empty());
        assert_eq!(f.node.mempool_snapshot().len(), 1);
    }

    #[test]
    fn chain_survives_restart_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let fund = TestKeys::generate();
        let rules = ChainRules::new(fund.authority());
        let store = ChainStore::new(dir.path().join("chain.json"));

        let node = Node::open(rules.clone(), store.clone(), Arc::new(LogSink)).unwrap();
        node.build_candidate(vec![], false).unwrap();
        let chain = node.full_chain();

        let reopened = Node::open(rules, store, Arc::new(LogSink)).unwrap();
        assert_eq!(reopened.full_chain(), chain);

        let foreign = ChainRules::new(TestKeys::generate().authority());
        let store = ChainStore::new(dir.path().join("chain.json"));
        assert!(Node::open(foreign, store, Arc::new(LogSink)).is_err());
    }

    #[test]
    fn concurrent_miners_never_fork_the_local_chain() {
        let f = fixture();
        let node = Arc::new(f.node);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let node = node.clone();
                std::thread::spawn(move || node.build_candidate(vec![], false))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let appended = results.iter().filter(|r| r.is_ok()).count();
        assert!(results.iter().all(|r| r.as_ref().map_or_else(|e| e.is_retryable(), |_| true)));
        assert_eq!(node.full_chain().len(), appended + 1);
        assert!(node.validate_local_chain().is_ok());
    }
}
