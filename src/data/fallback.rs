//! Hardcoded realistic quotes served when an upstream fails and nothing is cached.
//! Also the reference table the mock source jitters around.

use crate::{
    config::BINANCE,
    domain::{AssetClass, MarketQuote, QuoteMap},
};

/// (symbol, price, 24h change %)
type Row = (&'static str, f64, f64);

const FOREX: &[Row] = &[
    ("EURUSD", 1.0845, 0.12),
    ("GBPUSD", 1.2710, -0.08),
    ("USDJPY", 151.42, 0.35),
    ("AUDUSD", 0.6535, -0.21),
    ("USDCAD", 1.3580, 0.05),
    ("USDCHF", 0.9025, -0.11),
    ("NZDUSD", 0.5990, 0.18),
    ("EURGBP", 0.8532, 0.07),
];

const CRYPTO: &[Row] = &[
    ("BTC", 67_250.0, 2.45),
    ("ETH", 3_480.0, 1.82),
    ("SOL", 172.5, 4.10),
    ("BNB", 590.0, -0.65),
    ("XRP", 0.5240, -1.20),
    ("ADA", 0.4580, 0.90),
    ("DOGE", 0.1620, 3.30),
    ("AVAX", 36.80, -2.15),
];

const STOCKS: &[Row] = &[
    ("AAPL", 189.50, 0.85),
    ("MSFT", 421.30, 1.10),
    ("NVDA", 875.20, 3.40),
    ("GOOGL", 171.40, -0.45),
    ("AMZN", 182.10, 0.60),
    ("TSLA", 174.60, -2.30),
    ("META", 496.70, 1.55),
];

const ETF: &[Row] = &[
    ("SPY", 521.30, 0.40),
    ("QQQ", 445.80, 0.75),
    ("VTI", 258.60, 0.35),
    ("IWM", 205.10, -0.55),
    ("GLD", 215.40, 0.20),
    ("EEM", 41.80, -0.30),
];

const FUTURES: &[Row] = &[
    ("ES", 5_245.0, 0.38),
    ("NQ", 18_310.0, 0.72),
    ("YM", 39_580.0, 0.21),
    ("CL", 81.45, -1.05),
    ("GC", 2_335.0, 0.48),
    ("ZB", 117.20, -0.15),
];

fn table(class: AssetClass) -> &'static [Row] {
    match class {
        AssetClass::Forex => FOREX,
        AssetClass::Crypto => CRYPTO,
        AssetClass::Stocks => STOCKS,
        AssetClass::Etf => ETF,
        AssetClass::Futures => FUTURES,
    }
}

/// Reference (price, 24h change %) for a symbol. Crypto accepts exchange pairs like BTCUSDT.
pub fn reference_quote(class: AssetClass, symbol: &str) -> Option<(f64, f64)> {
    let upper = symbol.trim().to_uppercase();
    let lookup = match class {
        AssetClass::Crypto => upper
            .strip_suffix(BINANCE.quote_asset)
            .filter(|base| !base.is_empty())
            .unwrap_or(upper.as_str()),
        _ => upper.as_str(),
    };

    table(class)
        .iter()
        .find(|(s, _, _)| *s == lookup)
        .map(|&(_, price, change)| (price, change))
}

/// Fallback map for the requested symbols. Symbols with no reference row are left out.
pub fn fallback_quotes<S: AsRef<str>>(class: AssetClass, symbols: &[S], now_ms: i64) -> QuoteMap {
    symbols
        .iter()
        .filter_map(|s| {
            let symbol = s.as_ref().trim().to_uppercase();
            let (price, change) = reference_quote(class, &symbol)?;
            Some((symbol, MarketQuote::from_change_percent(price, change, now_ms)))
        })
        .collect()
}
