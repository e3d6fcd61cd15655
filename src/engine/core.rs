use {
    super::{
        error::{AccountError, TradeError},
        messages::{AccountEvent, PortfolioSummary, TradeReceipt},
        rate_limiter::TradeRateLimiter,
        validator,
    },
    crate::{
        config::TRADING,
        data::{AccountStore, LedgerChange, MemoryAccountStore},
        domain::{Deposit, Trade, TradeRequest, TransferStatus, User, Withdrawal, normalize_wallet},
        utils::{Clock, SystemClock},
    },
    anyhow::Result,
    std::sync::Arc,
    tokio::sync::broadcast,
    uuid::Uuid,
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// Account and trade bookkeeping over an [`AccountStore`].
///
/// Every balance mutation is a compare-and-swap through the store, so two desks (or two tasks)
/// sharing a store can never drive a balance negative.
pub struct TradingDesk {
    pub(super) store: Arc<dyn AccountStore>,
    limiter: TradeRateLimiter,
    pub(super) clock: Arc<dyn Clock>,
    events: broadcast::Sender<AccountEvent>,
}

impl TradingDesk {
    pub fn new(store: Arc<dyn AccountStore>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(TRADING.event_capacity);
        Self {
            store,
            limiter: TradeRateLimiter::new(TRADING.rate_limit_window, clock.clone()),
            clock,
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryAccountStore::new()), Arc::new(SystemClock))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }

    pub(super) fn publish(&self, event: AccountEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ---- Users ----

    pub async fn get_user_by_wallet(&self, wallet: &str) -> Result<Option<User>> {
        let normalized = normalize_wallet(wallet);
        self.store.get_user_by_wallet(&normalized).await
    }

    /// Idempotent per wallet. New users start with a zero balance.
    pub async fn create_user(&self, wallet: &str) -> Result<User> {
        let candidate = User::new(wallet, self.clock.now_ms());
        let user = self.store.insert_user_if_absent(&candidate).await?;
        if user.id == candidate.id {
            log::info!("New user {} for wallet {}", user.id, user.wallet_address);
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.store.get_user(user_id).await
    }

    pub async fn get_user_trades(&self, user_id: &str) -> Result<Vec<Trade>> {
        self.store.user_trades(user_id).await
    }

    pub async fn get_user_deposits(&self, user_id: &str) -> Result<Vec<Deposit>> {
        self.store.user_deposits(user_id).await
    }

    pub async fn get_user_withdrawals(&self, user_id: &str) -> Result<Vec<Withdrawal>> {
        self.store.user_withdrawals(user_id).await
    }

    // ---- Transfers ----

    /// Credit the balance and record a completed deposit.
    pub async fn create_deposit(
        &self,
        user_id: &str,
        amount: f64,
        tx_hash: Option<String>,
    ) -> Result<Deposit, AccountError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AccountError::InvalidAmount(amount));
        }

        let deposit = Deposit {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            tx_hash,
            status: TransferStatus::Completed,
            created_at_ms: self.clock.now_ms(),
        };

        for _ in 0..TRADING.cas_retries {
            let user = self.require_user(user_id).await?;
            let balance = user.balance + amount;
            if self
                .store
                .commit(user_id, user.balance, balance, LedgerChange::Deposit(&deposit))
                .await?
            {
                self.publish(AccountEvent::DepositCreated(deposit.clone()));
                self.publish(AccountEvent::BalanceChanged {
                    user_id: user_id.to_string(),
                    balance,
                });
                return Ok(deposit);
            }
        }
        Err(AccountError::Conflict(TRADING.cas_retries))
    }

    /// Debit the balance and record a pending withdrawal.
    pub async fn create_withdrawal(
        &self,
        user_id: &str,
        amount: f64,
        address: &str,
    ) -> Result<Withdrawal, AccountError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AccountError::InvalidAmount(amount));
        }

        let withdrawal = Withdrawal {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            address: address.trim().to_string(),
            status: TransferStatus::Pending,
            created_at_ms: self.clock.now_ms(),
        };

        for _ in 0..TRADING.cas_retries {
            let user = self.require_user(user_id).await?;
            if amount > user.balance {
                return Err(AccountError::InsufficientFunds {
                    required: amount,
                    available: user.balance,
                });
            }
            let balance = user.balance - amount;
            if self
                .store
                .commit(user_id, user.balance, balance, LedgerChange::Withdrawal(&withdrawal))
                .await?
            {
                self.publish(AccountEvent::WithdrawalCreated(withdrawal.clone()));
                self.publish(AccountEvent::BalanceChanged {
                    user_id: user_id.to_string(),
                    balance,
                });
                return Ok(withdrawal);
            }
        }
        Err(AccountError::Conflict(TRADING.cas_retries))
    }

    /// Administrative overwrite. Negative balances are refused.
    pub async fn update_user_balance(&self, user_id: &str, balance: f64) -> Result<User, AccountError> {
        if !balance.is_finite() || balance < 0.0 {
            return Err(AccountError::NegativeBalance(balance));
        }
        if !self.store.set_balance(user_id, balance).await? {
            return Err(AccountError::NotFound(user_id.to_string()));
        }
        self.publish(AccountEvent::BalanceChanged {
            user_id: user_id.to_string(),
            balance,
        });
        self.require_user(user_id).await
    }

    async fn require_user(&self, user_id: &str) -> Result<User, AccountError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(user_id.to_string()))
    }

    // ---- Trades ----

    /// Rate limit, bounds, funds, then an atomic deduct-and-record.
    pub async fn validate_balance_and_create_trade(
        &self,
        user_id: &str,
        req: &TradeRequest,
    ) -> Result<TradeReceipt, TradeError> {
        // 1. Rate limit
        if let Err(retry_after_ms) = self.limiter.check(user_id).await {
            #[cfg(debug_assertions)]
            if DF.log_trades {
                log::info!("Trade by {} rate limited ({}ms left)", user_id, retry_after_ms);
            }
            return Err(TradeError::RateLimitExceeded { retry_after_ms });
        }

        // 2. Bounds don't depend on the balance, check them once
        validator::check_amount(req.amount, req.timeframe)?;

        // 3. Funds + CAS commit. A lost race re-reads the balance and re-checks funds.
        for attempt in 0..TRADING.cas_retries {
            let user = self
                .store
                .get_user(user_id)
                .await?
                .ok_or_else(|| TradeError::UserNotFound(user_id.to_string()))?;

            let new_balance = validator::validate(req, user.balance)?;
            let trade = Trade::open(user_id, req, self.clock.now_ms());

            if self
                .store
                .commit(user_id, user.balance, new_balance, LedgerChange::NewTrade(&trade))
                .await?
            {
                #[cfg(debug_assertions)]
                if DF.log_trades {
                    log::info!(
                        "Trade {} opened: {} {} {} for {} (balance {:.2} -> {:.2})",
                        trade.id,
                        trade.direction,
                        trade.amount,
                        trade.symbol,
                        trade.timeframe,
                        user.balance,
                        new_balance
                    );
                }
                self.publish(AccountEvent::TradeCreated(trade.clone()));
                self.publish(AccountEvent::BalanceChanged {
                    user_id: user_id.to_string(),
                    balance: new_balance,
                });
                return Ok(TradeReceipt { trade, new_balance });
            }

            log::warn!("Balance CAS lost for {} (attempt {})", user_id, attempt + 1);
        }

        Err(TradeError::ConcurrentModification)
    }

    pub async fn portfolio(&self, user_id: &str) -> Result<PortfolioSummary, AccountError> {
        let user = self.require_user(user_id).await?;
        let trades = self.store.user_trades(user_id).await?;

        Ok(trades.iter().fold(
            PortfolioSummary {
                balance: user.balance,
                ..Default::default()
            },
            |mut acc, t| {
                acc.accrued_profit += t.profit;
                if t.is_active() {
                    acc.invested += t.amount;
                    acc.active_trades += 1;
                } else {
                    acc.completed_trades += 1;
                }
                acc
            },
        ))
    }
}
