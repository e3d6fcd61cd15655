// Domain types and value objects
mod account;
mod asset_class;
mod quote;
mod trade;

pub use account::{Deposit, TransferStatus, User, Withdrawal};
pub(crate) use account::normalize_wallet;
pub use asset_class::AssetClass;
pub use quote::{AssetQuote, MarketQuote, QuoteMap, QuoteOrigin, QuoteSnapshot, symbols_key};
pub use trade::{
    ParseTimeframeError, Timeframe, Trade, TradeDirection, TradeRequest, TradeStatus,
};
