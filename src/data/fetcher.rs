use {
    crate::{
        data::{QuoteSource, TtlCache, fallback_quotes},
        domain::{AssetClass, QuoteMap, QuoteOrigin, QuoteSnapshot, symbols_key},
        utils::Clock,
    },
    futures::future::join_all,
    std::{sync::Arc, time::Duration},
    strum::IntoEnumIterator,
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// Cached, failure-tolerant quote fetching for one asset class.
///
/// Fresh cache hit -> cached map. Miss -> upstream; success refreshes the cache.
/// Upstream failure -> last cached map for the key (even if stale), else the hardcoded table.
/// Never returns an error: the UI always has something to render.
pub struct QuoteFetcher {
    class: AssetClass,
    source: Arc<dyn QuoteSource>,
    cache: TtlCache<QuoteMap>,
    clock: Arc<dyn Clock>,
}

impl QuoteFetcher {
    pub fn new(class: AssetClass, source: Arc<dyn QuoteSource>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(class, source, clock, class.ttl())
    }

    pub fn with_ttl(
        class: AssetClass,
        source: Arc<dyn QuoteSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            class,
            source,
            cache: TtlCache::new(ttl, clock.clone()),
            clock,
        }
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn fetch<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteSnapshot {
        let key = symbols_key(symbols);
        if key.is_empty() {
            return self.snapshot(QuoteMap::new(), QuoteOrigin::Live);
        }

        // 1. Fresh cache
        if let Some(quotes) = self.cache.get_fresh(&key) {
            #[cfg(debug_assertions)]
            if DF.log_cache {
                log::info!("[{}] cache hit for {}", self.class, key);
            }
            return self.snapshot(quotes, QuoteOrigin::Cache);
        }

        // 2. Upstream
        let wanted: Vec<String> = key.split(',').map(str::to_string).collect();
        match self.source.fetch_quotes(self.class, &wanted).await {
            Ok(quotes) if !quotes.is_empty() => {
                self.cache.insert(&key, quotes.clone());
                self.snapshot(quotes, QuoteOrigin::Live)
            }
            Ok(_) => {
                log::warn!(
                    "[{}] {} returned no quotes for {}",
                    self.class,
                    self.source.name(),
                    key
                );
                self.fallback(&key, &wanted)
            }
            Err(e) => {
                log::warn!(
                    "[{}] {} fetch failed for {}: {:#}",
                    self.class,
                    self.source.name(),
                    key,
                    e
                );
                self.fallback(&key, &wanted)
            }
        }
    }

    /// 3. Stale cache, then hardcoded table
    fn fallback(&self, key: &str, wanted: &[String]) -> QuoteSnapshot {
        if let Some(entry) = self.cache.get_any(key) {
            #[cfg(debug_assertions)]
            if DF.log_fallbacks {
                log::info!(
                    "[{}] serving stale cache for {} (age {}ms)",
                    self.class,
                    key,
                    self.clock.now_ms() - entry.timestamp_ms
                );
            }
            return self.snapshot(entry.data, QuoteOrigin::StaleCache);
        }

        #[cfg(debug_assertions)]
        if DF.log_fallbacks {
            log::info!("[{}] serving hardcoded fallback for {}", self.class, key);
        }
        self.snapshot(
            fallback_quotes(self.class, wanted, self.clock.now_ms()),
            QuoteOrigin::Fallback,
        )
    }

    fn snapshot(&self, quotes: QuoteMap, origin: QuoteOrigin) -> QuoteSnapshot {
        QuoteSnapshot {
            class: self.class,
            quotes,
            origin,
        }
    }
}

/// One fetcher per market tab
pub struct MarketData {
    // Indexed by `AssetClass as usize`
    fetchers: Vec<QuoteFetcher>,
}

impl MarketData {
    /// Every class served by the same source
    pub fn new(source: Arc<dyn QuoteSource>, clock: Arc<dyn Clock>) -> Self {
        let fetchers = AssetClass::iter()
            .map(|class| QuoteFetcher::new(class, source.clone(), clock.clone()))
            .collect();
        Self { fetchers }
    }

    /// Swap the upstream for one class (e.g. live Binance for crypto, mock for the rest)
    pub fn with_source(
        mut self,
        class: AssetClass,
        source: Arc<dyn QuoteSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.fetchers[class as usize] = QuoteFetcher::new(class, source, clock);
        self
    }

    pub fn fetcher(&self, class: AssetClass) -> &QuoteFetcher {
        &self.fetchers[class as usize]
    }

    pub async fn fetch<S: AsRef<str>>(&self, class: AssetClass, symbols: &[S]) -> QuoteSnapshot {
        self.fetcher(class).fetch(symbols).await
    }

    pub async fn forex<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteSnapshot {
        self.fetch(AssetClass::Forex, symbols).await
    }

    pub async fn crypto<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteSnapshot {
        self.fetch(AssetClass::Crypto, symbols).await
    }

    pub async fn stocks<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteSnapshot {
        self.fetch(AssetClass::Stocks, symbols).await
    }

    pub async fn etf<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteSnapshot {
        self.fetch(AssetClass::Etf, symbols).await
    }

    pub async fn futures<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteSnapshot {
        self.fetch(AssetClass::Futures, symbols).await
    }

    /// Fetch several tabs concurrently. Results come back in request order.
    pub async fn fetch_all(&self, requests: &[(AssetClass, Vec<String>)]) -> Vec<QuoteSnapshot> {
        join_all(
            requests
                .iter()
                .map(|(class, symbols)| self.fetch(*class, symbols)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockQuoteSource;
    use crate::domain::MarketQuote;
    use crate::utils::ManualClock;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts calls; fails or answers empty on demand
    struct ScriptedSource {
        calls: AtomicUsize,
        failing: AtomicBool,
        empty: AtomicBool,
        clock: Arc<ManualClock>,
    }

    impl ScriptedSource {
        fn new(clock: Arc<ManualClock>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                empty: AtomicBool::new(false),
                clock,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn set_empty(&self, empty: bool) {
            self.empty.store(empty, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_quotes(&self, _class: AssetClass, symbols: &[String]) -> Result<QuoteMap> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                bail!("upstream timeout");
            }
            if self.empty.load(Ordering::SeqCst) {
                return Ok(QuoteMap::new());
            }
            Ok(symbols
                .iter()
                .map(|s| {
                    let quote = MarketQuote::from_change_percent(n as f64 * 10.0, 1.0, self.clock.now_ms());
                    (s.clone(), quote)
                })
                .collect())
        }
    }

    fn setup(class: AssetClass) -> (Arc<ManualClock>, Arc<ScriptedSource>, QuoteFetcher) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let source = ScriptedSource::new(clock.clone());
        let fetcher = QuoteFetcher::new(class, source.clone(), clock.clone());
        (clock, source, fetcher)
    }

    #[tokio::test]
    async fn within_ttl_serves_identical_cached_data() {
        let (clock, source, fetcher) = setup(AssetClass::Crypto);

        let first = fetcher.fetch(&["BTC", "ETH"]).await;
        assert_eq!(first.origin, QuoteOrigin::Live);

        clock.advance_ms(14_000);
        let second = fetcher.fetch(&["eth", "btc"]).await;
        assert_eq!(second.origin, QuoteOrigin::Cache);
        assert_eq!(second.quotes, first.quotes);
        assert_eq!(
            serde_json::to_string(&second.quotes).unwrap(),
            serde_json::to_string(&first.quotes).unwrap()
        );
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_refresh() {
        let (clock, source, fetcher) = setup(AssetClass::Crypto);
        fetcher.fetch(&["BTC"]).await;
        clock.advance_ms(15_000);

        let refreshed = fetcher.fetch(&["BTC"]).await;
        assert_eq!(refreshed.origin, QuoteOrigin::Live);
        assert_eq!(refreshed.quotes["BTC"].price, 20.0);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn empty_upstream_answer_counts_as_failure() {
        let (clock, source, fetcher) = setup(AssetClass::Forex);
        source.set_empty(true);

        let cold = fetcher.fetch(&["EURUSD"]).await;
        assert_eq!(cold.origin, QuoteOrigin::Fallback);
        assert_eq!(cold.quotes.len(), 1);
        assert!(fetcher.cache.is_empty());

        source.set_empty(false);
        let live = fetcher.fetch(&["EURUSD"]).await;
        assert_eq!(live.origin, QuoteOrigin::Live);

        clock.advance_ms(31_000);
        source.set_empty(true);
        let stale = fetcher.fetch(&["EURUSD"]).await;
        assert_eq!(stale.origin, QuoteOrigin::StaleCache);
        assert_eq!(stale.quotes, live.quotes);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn failure_serves_last_cached_value() {
        let (clock, source, fetcher) = setup(AssetClass::Stocks);
        let live = fetcher.fetch(&["AAPL"]).await;

        clock.advance_ms(60_000);
        source.set_failing(true);
        let stale = fetcher.fetch(&["AAPL"]).await;

        assert_eq!(stale.origin, QuoteOrigin::StaleCache);
        assert!(stale.is_degraded());
        assert_eq!(stale.quotes, live.quotes);
    }

    #[tokio::test]
    async fn failure_without_cache_serves_hardcoded_table() {
        let (_clock, source, fetcher) = setup(AssetClass::Forex);
        source.set_failing(true);

        let snap = fetcher.fetch(&["EURUSD", "XXXYYY"]).await;
        assert_eq!(snap.origin, QuoteOrigin::Fallback);
        assert_eq!(snap.quotes.len(), 1);
        assert_eq!(snap.quotes["EURUSD"].price, 1.0845);
    }

    #[tokio::test]
    async fn recovery_refreshes_cache_again() {
        let (clock, source, fetcher) = setup(AssetClass::Futures);
        source.set_failing(true);
        fetcher.fetch(&["ES"]).await;

        source.set_failing(false);
        clock.advance_ms(1);
        let snap = fetcher.fetch(&["ES"]).await;
        assert_eq!(snap.origin, QuoteOrigin::Live);

        let cached = fetcher.fetch(&["ES"]).await;
        assert_eq!(cached.origin, QuoteOrigin::Cache);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn empty_request_skips_upstream() {
        let (_clock, source, fetcher) = setup(AssetClass::Etf);
        let snap = fetcher.fetch::<&str>(&[]).await;
        assert!(snap.quotes.is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn market_data_routes_each_tab() {
        let clock = Arc::new(ManualClock::new(0));
        let market = MarketData::new(Arc::new(MockQuoteSource::seeded(1, clock.clone())), clock);

        let results = market
            .fetch_all(&[
                (AssetClass::Forex, vec!["EURUSD".into()]),
                (AssetClass::Crypto, vec!["BTC".into()]),
                (AssetClass::Etf, vec!["SPY".into(), "QQQ".into()]),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].class, AssetClass::Forex);
        assert!(results[1].quotes.contains_key("BTC"));
        assert_eq!(results[2].quotes.len(), 2);
        assert_eq!(market.stocks(&["AAPL"]).await.class, AssetClass::Stocks);
        assert_eq!(market.futures(&["CL"]).await.origin, QuoteOrigin::Live);
    }

    #[tokio::test]
    async fn per_class_source_override() {
        let clock = Arc::new(ManualClock::new(0));
        let scripted = ScriptedSource::new(clock.clone());
        let market = MarketData::new(Arc::new(MockQuoteSource::seeded(2, clock.clone())), clock.clone())
            .with_source(AssetClass::Crypto, scripted.clone(), clock);

        market.crypto(&["BTC"]).await;
        market.forex(&["EURUSD"]).await;
        assert_eq!(scripted.calls(), 1);
        assert_eq!(market.fetcher(AssetClass::Crypto).source_name(), "scripted");
        assert_eq!(market.fetcher(AssetClass::Forex).source_name(), "mock");
    }
}
