use {
    crate::domain::{Deposit, Trade, User, Withdrawal},
    anyhow::{Result, bail},
    async_trait::async_trait,
    std::{
        collections::HashMap,
        sync::{Mutex, MutexGuard, PoisonError},
    },
};

/// The record written together with a balance change
#[derive(Debug, Clone, Copy)]
pub enum LedgerChange<'a> {
    None,
    NewTrade(&'a Trade),
    TradeUpdate(&'a Trade),
    Deposit(&'a Deposit),
    Withdrawal(&'a Withdrawal),
}

/// Persistence boundary for users, trades and transfers.
///
/// Balance changes go through [`AccountStore::commit`], a compare-and-swap: the new balance
/// and its ledger record are written only if the stored balance still equals `expected`.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn get_user_by_wallet(&self, wallet: &str) -> Result<Option<User>>;

    /// Insert unless the wallet already has a user. Returns whichever user now owns the wallet.
    async fn insert_user_if_absent(&self, user: &User) -> Result<User>;

    /// Overwrite without a CAS guard. Returns false when the user does not exist.
    async fn set_balance(&self, user_id: &str, balance: f64) -> Result<bool>;

    /// Atomic CAS of the balance plus `change`. Ok(false) on a lost race or unknown user.
    async fn commit(
        &self,
        user_id: &str,
        expected: f64,
        new_balance: f64,
        change: LedgerChange<'_>,
    ) -> Result<bool>;

    async fn get_trade(&self, trade_id: &str) -> Result<Option<Trade>>;
    /// Newest first
    async fn user_trades(&self, user_id: &str) -> Result<Vec<Trade>>;
    async fn active_trades(&self) -> Result<Vec<Trade>>;
    /// Newest first
    async fn user_deposits(&self, user_id: &str) -> Result<Vec<Deposit>>;
    /// Newest first
    async fn user_withdrawals(&self, user_id: &str) -> Result<Vec<Withdrawal>>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    wallets: HashMap<String, String>,
    // Insertion order; reversed on read
    trades: Vec<Trade>,
    deposits: Vec<Deposit>,
    withdrawals: Vec<Withdrawal>,
}

/// Process-local store. Good for the demo and tests; state dies with the process.
#[derive(Default)]
pub struct MemoryAccountStore {
    state: Mutex<MemoryState>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn newest_first<T: Clone>(items: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    items.iter().rev().filter(|i| keep(i)).cloned().collect()
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.state().users.get(user_id).cloned())
    }

    async fn get_user_by_wallet(&self, wallet: &str) -> Result<Option<User>> {
        let state = self.state();
        Ok(state
            .wallets
            .get(wallet)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn insert_user_if_absent(&self, user: &User) -> Result<User> {
        let mut guard = self.state();
        let state = &mut *guard;
        if let Some(existing) = state
            .wallets
            .get(&user.wallet_address)
            .and_then(|id| state.users.get(id))
        {
            return Ok(existing.clone());
        }
        if state.users.contains_key(&user.id) {
            bail!("user id {} already exists", user.id);
        }
        state
            .wallets
            .insert(user.wallet_address.clone(), user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn set_balance(&self, user_id: &str, balance: f64) -> Result<bool> {
        Ok(match self.state().users.get_mut(user_id) {
            Some(user) => {
                user.balance = balance;
                true
            }
            None => false,
        })
    }

    async fn commit(
        &self,
        user_id: &str,
        expected: f64,
        new_balance: f64,
        change: LedgerChange<'_>,
    ) -> Result<bool> {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(user) = state.users.get_mut(user_id) else {
            return Ok(false);
        };
        if user.balance != expected {
            return Ok(false);
        }
        if let LedgerChange::TradeUpdate(trade) = change {
            if !state.trades.iter().any(|t| t.id == trade.id) {
                bail!("trade {} not found", trade.id);
            }
        }
        user.balance = new_balance;

        match change {
            LedgerChange::None => {}
            LedgerChange::NewTrade(trade) => state.trades.push(trade.clone()),
            LedgerChange::TradeUpdate(trade) => {
                if let Some(slot) = state.trades.iter_mut().find(|t| t.id == trade.id) {
                    *slot = trade.clone();
                }
            }
            LedgerChange::Deposit(deposit) => state.deposits.push(deposit.clone()),
            LedgerChange::Withdrawal(withdrawal) => state.withdrawals.push(withdrawal.clone()),
        }
        Ok(true)
    }

    async fn get_trade(&self, trade_id: &str) -> Result<Option<Trade>> {
        Ok(self.state().trades.iter().find(|t| t.id == trade_id).cloned())
    }

    async fn user_trades(&self, user_id: &str) -> Result<Vec<Trade>> {
        Ok(newest_first(&self.state().trades, |t| t.user_id == user_id))
    }

    async fn active_trades(&self) -> Result<Vec<Trade>> {
        Ok(self
            .state()
            .trades
            .iter()
            .filter(|t| t.is_active())
            .cloned()
            .collect())
    }

    async fn user_deposits(&self, user_id: &str) -> Result<Vec<Deposit>> {
        Ok(newest_first(&self.state().deposits, |d| d.user_id == user_id))
    }

    async fn user_withdrawals(&self, user_id: &str) -> Result<Vec<Withdrawal>> {
        Ok(newest_first(&self.state().withdrawals, |w| w.user_id == user_id))
    }
}
