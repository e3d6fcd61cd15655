use {
    crate::domain::{Deposit, Trade, Withdrawal},
    serde::Serialize,
};

/// Broadcast after every committed account change. Consumers filter by `user_id()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AccountEvent {
    BalanceChanged { user_id: String, balance: f64 },
    TradeCreated(Trade),
    TradeUpdated(Trade),
    DepositCreated(Deposit),
    WithdrawalCreated(Withdrawal),
}

impl AccountEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::BalanceChanged { user_id, .. } => user_id,
            Self::TradeCreated(t) | Self::TradeUpdated(t) => &t.user_id,
            Self::DepositCreated(d) => &d.user_id,
            Self::WithdrawalCreated(w) => &w.user_id,
        }
    }
}

/// Returned by a successful trade creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReceipt {
    pub trade: Trade,
    pub new_balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub balance: f64,
    /// Principal locked in active trades
    pub invested: f64,
    /// Profit credited so far across all trades
    pub accrued_profit: f64,
    pub active_trades: usize,
    pub completed_trades: usize,
}
