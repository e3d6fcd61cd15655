use {
    super::AssetClass,
    itertools::Itertools,
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

/// One symbol's entry in a fetcher result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub price: f64,
    /// Absolute 24h change
    pub change: f64,
    pub change_percent: f64,
    pub timestamp_ms: i64,
}

impl MarketQuote {
    /// Build from a price and a 24h percent change, deriving the absolute change.
    pub fn from_change_percent(price: f64, change_percent: f64, timestamp_ms: i64) -> Self {
        let prev = price / (1.0 + change_percent / 100.0);
        Self {
            price,
            change: price - prev,
            change_percent,
            timestamp_ms,
        }
    }
}

/// Symbol -> quote. Ordered so identical content always compares and serializes identically.
pub type QuoteMap = BTreeMap<String, MarketQuote>;

/// Where a served snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum QuoteOrigin {
    /// Fresh upstream response
    Live,
    /// Cache entry within its TTL
    Cache,
    /// Upstream failed; last known entry past its TTL
    StaleCache,
    /// Upstream failed and nothing was cached; hardcoded table
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub class: AssetClass,
    pub quotes: QuoteMap,
    pub origin: QuoteOrigin,
}

impl QuoteSnapshot {
    pub fn is_degraded(&self) -> bool {
        matches!(self.origin, QuoteOrigin::StaleCache | QuoteOrigin::Fallback)
    }
}

/// Display row for the market tables and cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub symbol: String,
    pub price: f64,
    /// Percent
    pub change_24h: f64,
    pub is_positive: bool,
    pub last_updated_ms: i64,
    pub sparkline: Vec<f64>,
}

impl AssetQuote {
    pub fn from_market(symbol: &str, quote: &MarketQuote, sparkline: Vec<f64>) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: quote.price,
            change_24h: quote.change_percent,
            is_positive: quote.change_percent >= 0.0,
            last_updated_ms: quote.timestamp_ms,
            sparkline,
        }
    }
}

/// Request signature for a symbol list: upper-cased, sorted, de-duplicated, comma-joined.
pub fn symbols_key<S: AsRef<str>>(symbols: &[S]) -> String {
    symbols
        .iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .sorted()
        .dedup()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_order_case_and_duplicates() {
        assert_eq!(symbols_key(&["eth", "BTC", "eth"]), "BTC,ETH");
        assert_eq!(symbols_key(&["BTC", "ETH"]), symbols_key(&["ETH", "btc"]));
        assert_eq!(symbols_key::<&str>(&[]), "");
    }

    #[test]
    fn absolute_change_matches_percent() {
        let q = MarketQuote::from_change_percent(110.0, 10.0, 0);
        assert!((q.change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn asset_quote_flags_direction() {
        let q = MarketQuote::from_change_percent(50.0, -1.5, 7);
        let row = AssetQuote::from_market("SOL", &q, vec![50.0]);
        assert!(!row.is_positive);
        assert_eq!(row.last_updated_ms, 7);
    }
}
