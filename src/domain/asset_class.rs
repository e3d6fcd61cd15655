use {
    crate::config::MARKET,
    serde::{Deserialize, Serialize},
    std::time::Duration,
    strum_macros::{Display, EnumIter, EnumString},
};

/// The market tabs of the data browser
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumIter, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum AssetClass {
    Forex,
    Crypto,
    Stocks,
    #[strum(to_string = "ETF")]
    Etf,
    Futures,
}

impl AssetClass {
    /// How long a fetched quote map stays fresh
    pub fn ttl(&self) -> Duration {
        match self {
            Self::Forex => MARKET.ttl.forex,
            Self::Crypto => MARKET.ttl.crypto,
            Self::Stocks => MARKET.ttl.stocks,
            Self::Etf => MARKET.ttl.etf,
            Self::Futures => MARKET.ttl.futures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn ttls_stay_within_fifteen_to_thirty_seconds() {
        for class in AssetClass::iter() {
            let ttl = class.ttl().as_secs();
            assert!((15..=30).contains(&ttl), "{} ttl {}", class, ttl);
        }
    }

    #[test]
    fn parses_tab_names() {
        assert_eq!(AssetClass::from_str("etf").ok(), Some(AssetClass::Etf));
        assert_eq!(AssetClass::from_str("Crypto").ok(), Some(AssetClass::Crypto));
        assert_eq!(AssetClass::Etf.to_string(), "ETF");
    }
}
