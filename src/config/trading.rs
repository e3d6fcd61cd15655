//! Smart Trading plan rules: amount windows, yields, rate limits.
use std::time::Duration;

/// Amount window and total return for one timeframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeframeTier {
    pub days: u32,
    pub min_amount: f64,
    pub max_amount: f64,
    /// Total return over the full window, as a fraction (0.05 = 5%)
    pub total_return: f64,
}

pub struct TradingConfig {
    /// Minimum gap between two trade-creation attempts by the same user
    pub rate_limit_window: Duration,
    /// Profit accrual loop cadence
    pub accrual_interval: Duration,
    /// Event channel capacity for account subscriptions
    pub event_capacity: usize,
    /// How many times a balance credit retries after losing a compare-and-swap race
    pub cas_retries: usize,
    /// Rate limiter map size that triggers a sweep of expired users
    pub rate_limit_prune_at: usize,
    pub tiers: [TimeframeTier; 6],
}

pub const TRADING: TradingConfig = TradingConfig {
    rate_limit_window: Duration::from_secs(5),
    accrual_interval: Duration::from_secs(5),
    event_capacity: 256,
    cas_retries: 8,
    rate_limit_prune_at: 1_024,
    tiers: [
        TimeframeTier {
            days: 1,
            min_amount: 1_000.0,
            max_amount: 9_999.0,
            total_return: 0.05,
        },
        TimeframeTier {
            days: 7,
            min_amount: 10_000.0,
            max_amount: 49_999.0,
            total_return: 0.35,
        },
        TimeframeTier {
            days: 15,
            min_amount: 50_000.0,
            max_amount: 99_999.0,
            total_return: 0.75,
        },
        TimeframeTier {
            days: 30,
            min_amount: 100_000.0,
            max_amount: 499_999.0,
            total_return: 1.50,
        },
        TimeframeTier {
            days: 60,
            min_amount: 500_000.0,
            max_amount: 999_999.0,
            total_return: 3.00,
        },
        TimeframeTier {
            days: 90,
            min_amount: 1_000_000.0,
            max_amount: 4_999_999.0,
            total_return: 4.50,
        },
    ],
};
