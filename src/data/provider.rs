use {
    crate::{
        config::{BINANCE, MARKET},
        data::reference_quote,
        domain::{AssetClass, MarketQuote, QuoteMap},
        utils::{Clock, percent_change, price_decimals, round_to},
    },
    anyhow::{Result, anyhow, bail},
    async_trait::async_trait,
    binance_sdk::{
        config::ConfigurationRestApi,
        spot::{
            SpotRestApi,
            rest_api::{TickerPriceParams, TickerPriceResponse},
        },
    },
    rand::{Rng, SeedableRng, rngs::StdRng},
    std::{
        collections::HashMap,
        sync::{Arc, Mutex, PoisonError},
    },
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// Abstract interface for an upstream quote provider.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quotes for `symbols` (already upper-cased and de-duplicated).
    /// Symbols the provider does not know are simply absent from the map.
    async fn fetch_quotes(&self, class: AssetClass, symbols: &[String]) -> Result<QuoteMap>;
}

/// Synthesizes quotes by jittering the reference table. Stands in for the demo-key providers.
pub struct MockQuoteSource {
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl MockQuoteSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            clock,
        }
    }

    /// Reproducible quotes for tests and demos
    pub fn seeded(seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            clock,
        }
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_quotes(&self, class: AssetClass, symbols: &[String]) -> Result<QuoteMap> {
        let now = self.clock.now_ms();
        let noise_pct = MARKET.mock_noise_pct;
        let change_pct = MARKET.mock_change_pct;

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut quotes = QuoteMap::new();

        for symbol in symbols {
            let Some((reference, _)) = reference_quote(class, symbol) else {
                continue;
            };
            let jitter = rng.gen_range(-noise_pct..=noise_pct) / 100.0;
            let price = round_to(reference * (1.0 + jitter), price_decimals(reference));
            let change = round_to(rng.gen_range(-change_pct..=change_pct), 2);

            quotes.insert(
                symbol.to_uppercase(),
                MarketQuote::from_change_percent(price, change, now),
            );
        }

        Ok(quotes)
    }
}

/// Live crypto prices from the Binance spot REST ticker.
/// The ticker carries no 24h change, so change is measured against the previous observation.
pub struct BinanceQuoteSource {
    clock: Arc<dyn Clock>,
    last_prices: Mutex<HashMap<String, f64>>,
}

impl BinanceQuoteSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_prices: Mutex::new(HashMap::new()),
        }
    }

    /// BTC -> BTCUSDT; already-paired symbols pass through
    fn pair_name(symbol: &str) -> String {
        let upper = symbol.to_uppercase();
        if upper.ends_with(BINANCE.quote_asset) {
            upper
        } else {
            format!("{}{}", upper, BINANCE.quote_asset)
        }
    }

    /// Batch request restricted to the wanted pairs, sorted for a stable query string
    fn ticker_params(wanted: &HashMap<String, &String>) -> TickerPriceParams {
        let mut pairs: Vec<String> = wanted.keys().cloned().collect();
        pairs.sort();
        TickerPriceParams {
            symbol: None,
            symbols: Some(pairs),
            symbol_status: None,
        }
    }
}

#[async_trait]
impl QuoteSource for BinanceQuoteSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch_quotes(&self, class: AssetClass, symbols: &[String]) -> Result<QuoteMap> {
        if class != AssetClass::Crypto {
            bail!("Binance only quotes crypto, asked for {}", class);
        }

        let rest_conf = ConfigurationRestApi::builder()
            .timeout(BINANCE.rest.timeout_ms)
            .retries(BINANCE.rest.retries)
            .backoff(BINANCE.rest.backoff_ms)
            .build()
            .map_err(|e| anyhow!("Failed to build Binance REST config: {:?}", e))?;

        let client = SpotRestApi::production(rest_conf);

        // Exchange pair -> symbol the caller asked for
        let wanted: HashMap<String, &String> = symbols
            .iter()
            .map(|s| (Self::pair_name(s), s))
            .collect();
        if wanted.is_empty() {
            return Ok(QuoteMap::new());
        }
        let params = Self::ticker_params(&wanted);

        // 1. Make the Request
        let response = client
            .ticker_price(params)
            .await
            .map_err(|e| anyhow!("Binance ticker request failed: {:?}", e))?;

        // 2. Extract the batch payload
        let all_tickers = match response
            .data()
            .await
            .map_err(|e| anyhow!("Failed to parse Binance ticker data: {:?}", e))?
        {
            TickerPriceResponse::TickerPriceResponse2(all_tickers) => all_tickers,
            TickerPriceResponse::TickerPriceResponse1(_) => {
                bail!("Unexpected 'Single' response type during batch ticker fetch")
            }
            _ => bail!("Unexpected 'Other' response type from Binance ticker"),
        };

        // 3. Map exchange pairs back to the symbols the caller asked for
        let now = self.clock.now_ms();
        let mut last_prices = self
            .last_prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut quotes = QuoteMap::new();

        for ticker in all_tickers {
            if let (Some(s), Some(p)) = (&ticker.symbol, &ticker.price) {
                let Some(requested) = wanted.get(&s.to_uppercase()) else {
                    continue;
                };
                let price = p.parse::<f64>().unwrap_or(0.0);
                if price <= 0.0 {
                    continue;
                }
                let change_percent = last_prices
                    .insert(requested.to_string(), price)
                    .map(|prev| percent_change(prev, price))
                    .unwrap_or(0.0);

                quotes.insert(
                    requested.to_string(),
                    MarketQuote::from_change_percent(price, change_percent, now),
                );
            }
        }

        #[cfg(debug_assertions)]
        if DF.log_price_stream_updates {
            log::info!(
                ">>> Binance: quoted {}/{} symbols.",
                quotes.len(),
                symbols.len()
            );
        }

        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn mock_quotes_stay_near_reference() {
        let source = MockQuoteSource::seeded(5, Arc::new(ManualClock::new(77)));
        let quotes = source
            .fetch_quotes(AssetClass::Crypto, &symbols(&["BTC", "ETH", "UNKNOWN"]))
            .await
            .unwrap();

        assert_eq!(quotes.len(), 2);
        let btc = quotes["BTC"];
        assert!((btc.price / 67_250.0 - 1.0).abs() <= MARKET.mock_noise_pct / 100.0 + 1e-6);
        assert!(btc.change_percent.abs() <= MARKET.mock_change_pct);
        assert_eq!(btc.timestamp_ms, 77);
    }

    #[tokio::test]
    async fn seeded_mock_is_reproducible() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let a = MockQuoteSource::seeded(9, clock.clone());
        let b = MockQuoteSource::seeded(9, clock);
        let wanted = symbols(&["EURUSD", "USDJPY"]);
        assert_eq!(
            a.fetch_quotes(AssetClass::Forex, &wanted).await.unwrap(),
            b.fetch_quotes(AssetClass::Forex, &wanted).await.unwrap()
        );
    }

    #[test]
    fn binance_pair_names() {
        assert_eq!(BinanceQuoteSource::pair_name("btc"), "BTCUSDT");
        assert_eq!(BinanceQuoteSource::pair_name("ETHUSDT"), "ETHUSDT");
    }

    #[test]
    fn binance_request_carries_only_wanted_pairs() {
        let asked = symbols(&["eth", "BTC", "SOLUSDT"]);
        let wanted: HashMap<String, &String> = asked
            .iter()
            .map(|s| (BinanceQuoteSource::pair_name(s), s))
            .collect();

        let params = BinanceQuoteSource::ticker_params(&wanted);
        assert_eq!(params.symbol, None);
        assert_eq!(
            params.symbols,
            Some(vec!["BTCUSDT".to_string(), "ETHUSDT".to_string(), "SOLUSDT".to_string()])
        );
    }

    #[tokio::test]
    async fn binance_rejects_non_crypto_without_network() {
        let source = BinanceQuoteSource::new(Arc::new(ManualClock::new(0)));
        let result = source
            .fetch_quotes(AssetClass::Stocks, &symbols(&["AAPL"]))
            .await;
        assert!(result.is_err());
    }
}
