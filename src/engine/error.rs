use {crate::domain::Timeframe, thiserror::Error};

/// Why a trade-creation request was refused
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Too many trade requests. Try again in {:.1}s", *retry_after_ms as f64 / 1000.0)]
    RateLimitExceeded { retry_after_ms: i64 },

    #[error("Amount {amount} is outside the {timeframe} window ({min} - {max})")]
    InvalidAmount {
        timeframe: Timeframe,
        min: f64,
        max: f64,
        amount: f64,
    },

    #[error("Insufficient balance: need {required:.2}, have {available:.2} (short {shortfall:.2})")]
    InsufficientFunds {
        required: f64,
        available: f64,
        shortfall: f64,
    },

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Balance changed while the trade was being placed")]
    ConcurrentModification,

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl TradeError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// The caller should offer a deposit flow
    pub fn suggests_deposit(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }
}

/// Failures of the plain account operations (deposits, withdrawals, balance overrides)
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User {0} not found")]
    NotFound(String),

    #[error("Amount must be a positive number, got {0}")]
    InvalidAmount(f64),

    #[error("Insufficient balance: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Balance cannot be negative ({0})")]
    NegativeBalance(f64),

    #[error("Balance kept changing; gave up after {0} attempts")]
    Conflict(usize),

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}
