//! Configuration module for the smart trading core.

// Can all be private now because we have a public re-export.
mod binance;
mod debug;
mod demo;
mod market;
mod persistence;
mod synth;
mod trading;

// Re-export commonly used items
pub use binance::{BINANCE, BinanceConfig, RestClientConfig};
pub use debug::DF;
pub use demo::DEMO;
pub use market::{MARKET, MarketConfig};
pub use persistence::PERSISTENCE;
pub use synth::{SYNTH, SynthConfig, SynthTier};
pub use trading::{TRADING, TimeframeTier, TradingConfig};
