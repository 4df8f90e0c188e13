//! Account balances carried in every block.
//!
//! A block never stores a delta: it stores the full snapshot that results
//! from applying its approved transactions to its predecessor's snapshot.

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};
use crate::transaction::{Transaction, TxKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub wallet: String,
    pub deposit: i64,
    pub lend: i64,
}

impl Balance {
    pub fn new(wallet: impl Into<String>, deposit: i64, lend: i64) -> Self {
        Self {
            wallet: wallet.into(),
            deposit,
            lend,
        }
    }

    pub fn zero(wallet: impl Into<String>) -> Self {
        Self::new(wallet, 0, 0)
    }

    /// Canonical rendering used inside block hashes.
    pub fn canonical(&self) -> String {
        format!("{}{}{}", self.wallet, self.deposit, self.lend)
    }

    fn apply(&mut self, kind: TxKind, amount: i64, policy: LedgerPolicy) -> Result<()> {
        let (deposit, lend) = match kind {
            TxKind::Deposit => (self.deposit.checked_add(amount), Some(self.lend)),
            TxKind::Withdraw => (self.deposit.checked_sub(amount), Some(self.lend)),
            TxKind::Lend => (Some(self.deposit), self.lend.checked_add(amount)),
            TxKind::Pay => (Some(self.deposit), self.lend.checked_sub(amount)),
        };
        let (Some(deposit), Some(lend)) = (deposit, lend) else {
            return Err(NodeError::consensus(format!(
                "{kind:?} of {amount} overflows the balance of {}",
                self.wallet
            )));
        };

        if !policy.allow_negative_balances && (deposit < 0 || lend < 0) {
            return Err(NodeError::consensus(format!(
                "{kind:?} of {amount} would overdraw {} (deposit {deposit}, lend {lend})",
                self.wallet
            )));
        }
        self.deposit = deposit;
        self.lend = lend;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerPolicy {
    /// Permit effects that drive a deposit or lend total below zero.
    pub allow_negative_balances: bool,
}

/// Apply one line item to its wallet and mirror it on the fund.
///
/// DEPOSIT/WITHDRAW move the deposit totals, LEND/PAY the lend totals.
/// Both balances are left untouched when the effect is rejected.
pub fn apply_effect(
    kind: TxKind,
    amount: i64,
    user: &mut Balance,
    fund: &mut Balance,
    policy: LedgerPolicy,
) -> Result<()> {
    let mut next_user = user.clone();
    let mut next_fund = fund.clone();
    next_user.apply(kind, amount, policy)?;
    next_fund.apply(kind, amount, policy)?;
    *user = next_user;
    *fund = next_fund;
    Ok(())
}

fn position_or_insert(balances: &mut Vec<Balance>, wallet: &str) -> usize {
    match balances.iter().position(|b| b.wallet == wallet) {
        Some(pos) => pos,
        None => {
            balances.push(Balance::zero(wallet));
            balances.len() - 1
        }
    }
}

/// New snapshot after applying every approved transaction in `txs`.
///
/// Wallets seen for the first time start at zero and are appended in
/// encounter order. Transactions that are pending or rejected do not
/// move balances. Line items against the fund wallet itself are counted
/// once.
pub fn project_balances(
    previous: &[Balance],
    txs: &[Transaction],
    fund_wallet: &str,
    policy: LedgerPolicy,
) -> Result<Vec<Balance>> {
    let mut balances = previous.to_vec();
    let fund_pos = position_or_insert(&mut balances, fund_wallet);

    for tx in txs.iter().filter(|tx| tx.is_approved == Some(true)) {
        for item in &tx.line_items {
            let user_pos = position_or_insert(&mut balances, &item.wallet);
            if user_pos == fund_pos {
                balances[fund_pos].apply(item.kind, item.amount, policy)?;
                continue;
            }
            let mut user = balances[user_pos].clone();
            let mut fund = balances[fund_pos].clone();
            apply_effect(item.kind, item.amount, &mut user, &mut fund, policy)
                .map_err(|e| NodeError::consensus(format!("tx {}: {e}", tx.id)))?;
            balances[user_pos] = user;
            balances[fund_pos] = fund;
        }
    }
    Ok(balances)
}

/// Balance of `wallet` in `snapshot`, zero if it was never touched.
pub fn balance_of(snapshot: &[Balance], wallet: &str) -> Balance {
    snapshot
        .iter()
        .find(|b| b.wallet == wallet)
        .cloned()
        .unwrap_or_else(|| Balance::zero(wallet))
}
