mod account_store;
mod cache;
mod fallback;
mod fetcher;
mod price_stream;
mod provider;
mod storage;

pub use {
    account_store::{AccountStore, LedgerChange, MemoryAccountStore},
    cache::{CacheEntry, TtlCache},
    fallback::{fallback_quotes, reference_quote},
    fetcher::{MarketData, QuoteFetcher},
    price_stream::{FeedHandle, PriceStreamManager, PriceSubscription},
    provider::{BinanceQuoteSource, MockQuoteSource, QuoteSource},
    storage::SqliteAccountStore,
};
