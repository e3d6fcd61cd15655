//! Binance spot REST settings for the live crypto source.

pub struct RestClientConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

pub struct BinanceConfig {
    pub rest: RestClientConfig,
    /// Appended to bare crypto symbols (BTC -> BTCUSDT)
    pub quote_asset: &'static str,
}

// Timeout stays below the poll interval
pub const BINANCE: BinanceConfig = BinanceConfig {
    rest: RestClientConfig {
        timeout_ms: 4_000,
        retries: 1,
        backoff_ms: 250,
    },
    quote_asset: "USDT",
};
