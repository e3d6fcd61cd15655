use crate::domain::AssetClass;

pub struct DemoConfig {
    pub starting_deposit: f64,
    pub wallet_address: &'static str,
}

impl DemoConfig {
    /// Default watchlist shown for each market tab
    pub fn symbols(&self, class: AssetClass) -> &'static [&'static str] {
        match class {
            AssetClass::Forex => &["EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "USDCHF"],
            AssetClass::Crypto => &["BTC", "ETH", "SOL", "BNB", "XRP", "DOGE"],
            AssetClass::Stocks => &["AAPL", "MSFT", "NVDA", "TSLA", "AMZN"],
            AssetClass::Etf => &["SPY", "QQQ", "VTI", "GLD", "IWM"],
            AssetClass::Futures => &["ES", "NQ", "CL", "GC", "ZB"],
        }
    }
}

pub const DEMO: DemoConfig = DemoConfig {
    starting_deposit: 5_000.0,
    wallet_address: "0xDEMO000000000000000000000000000000000001",
};
