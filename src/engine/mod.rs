mod accrual;
mod core;
mod error;
mod messages;
mod rate_limiter;
pub mod validator;

pub use {
    accrual::{AccrualHandle, AccrualReport, ProfitAccrual},
    core::TradingDesk,
    error::{AccountError, TradeError},
    messages::{AccountEvent, PortfolioSummary, TradeReceipt},
    rate_limiter::TradeRateLimiter,
};
