//! Quote fetching and polling constants.
use std::time::Duration;

pub struct CacheTtls {
    pub forex: Duration,
    pub crypto: Duration,
    pub stocks: Duration,
    pub etf: Duration,
    pub futures: Duration,
}

pub struct MarketConfig {
    /// Freshness window per asset class
    pub ttl: CacheTtls,
    /// How often a poller re-invokes its fetcher
    pub poll_interval: Duration,
    /// Capacity of each poller's broadcast channel. Slow subscribers skip ahead.
    pub channel_capacity: usize,
    /// Max +/- percentage move the mock source applies around the reference price
    pub mock_noise_pct: f64,
    /// Max +/- 24h change percentage the mock source reports
    pub mock_change_pct: f64,
    /// Default sparkline length on the market board
    pub sparkline_points: usize,
}

pub const MARKET: MarketConfig = MarketConfig {
    ttl: CacheTtls {
        forex: Duration::from_secs(30),
        crypto: Duration::from_secs(15),
        stocks: Duration::from_secs(20),
        etf: Duration::from_secs(30),
        futures: Duration::from_secs(20),
    },
    poll_interval: Duration::from_secs(5),
    channel_capacity: 16,
    mock_noise_pct: 0.5,
    mock_change_pct: 3.0,
    sparkline_points: 24,
};
