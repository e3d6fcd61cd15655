use {
    crate::{
        config::{TRADING, TimeframeTier},
        utils::TimeUtils,
    },
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
    uuid::Uuid,
};

/// Smart Trading plan duration. Governs the amount window and the yield schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::EnumIter)]
pub enum Timeframe {
    OneDay,
    SevenDays,
    FifteenDays,
    ThirtyDays,
    SixtyDays,
    NinetyDays,
}

impl Timeframe {
    pub fn days(&self) -> u32 {
        match self {
            Self::OneDay => 1,
            Self::SevenDays => 7,
            Self::FifteenDays => 15,
            Self::ThirtyDays => 30,
            Self::SixtyDays => 60,
            Self::NinetyDays => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            1 => Some(Self::OneDay),
            7 => Some(Self::SevenDays),
            15 => Some(Self::FifteenDays),
            30 => Some(Self::ThirtyDays),
            60 => Some(Self::SixtyDays),
            90 => Some(Self::NinetyDays),
            _ => None,
        }
    }

    pub fn tier(&self) -> &'static TimeframeTier {
        let days = self.days();
        // Every variant has a tier; the fallback to the first entry is unreachable.
        TRADING
            .tiers
            .iter()
            .find(|t| t.days == days)
            .unwrap_or(&TRADING.tiers[0])
    }

    pub fn duration_ms(&self) -> i64 {
        self.days() as i64 * TimeUtils::MS_IN_D
    }

    /// Inclusive amount window
    pub fn amount_bounds(&self) -> (f64, f64) {
        let tier = self.tier();
        (tier.min_amount, tier.max_amount)
    }

    pub fn total_return(&self) -> f64 {
        self.tier().total_return
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.days() {
            1 => write!(f, "1 Day"),
            d => write!(f, "{} Days", d),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timeframe '{0}' (expected one of 1/7/15/30/60/90 days)")]
pub struct ParseTimeframeError(pub String);

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    /// Accepts "30 Days", "1 day", "30d", "30".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let digits = lower
            .strip_suffix("days")
            .or_else(|| lower.strip_suffix("day"))
            .or_else(|| lower.strip_suffix('d'))
            .unwrap_or(lower.as_str())
            .trim();

        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_days)
            .ok_or_else(|| ParseTimeframeError(s.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum TradeDirection {
    Buy,
    Sell,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum TradeStatus {
    Active,
    Completed,
}

/// What the plan creator submits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub amount: f64,
    pub timeframe: Timeframe,
    pub direction: TradeDirection,
    pub open_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub amount: f64,
    pub timeframe: Timeframe,
    pub direction: TradeDirection,
    pub open_price: f64,
    pub close_price: Option<f64>,
    pub profit: f64,
    pub status: TradeStatus,
    pub created_at_ms: i64,
    pub end_time_ms: i64,
}

impl Trade {
    pub fn open(user_id: &str, req: &TradeRequest, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            symbol: req.symbol.to_uppercase(),
            amount: req.amount,
            timeframe: req.timeframe,
            direction: req.direction,
            open_price: req.open_price,
            close_price: None,
            profit: 0.0,
            status: TradeStatus::Active,
            created_at_ms: now_ms,
            end_time_ms: now_ms + req.timeframe.duration_ms(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TradeStatus::Active
    }

    /// Elapsed share of the plan window, clamped to [0, 1]
    pub fn elapsed_fraction(&self, now_ms: i64) -> f64 {
        let duration = (self.end_time_ms - self.created_at_ms).max(1) as f64;
        ((now_ms - self.created_at_ms) as f64 / duration).clamp(0.0, 1.0)
    }

    /// Linear pro-rata of the tier's total return. Derived from `created_at_ms` only.
    pub fn accrued_profit(&self, now_ms: i64) -> f64 {
        self.amount * self.timeframe.total_return() * self.elapsed_fraction(now_ms)
    }
}
