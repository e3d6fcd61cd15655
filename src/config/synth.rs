//! Price synthesizer tuning. These bands bound visual volatility only.

/// Band and per-step volatility for prices at or above `min_price`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthTier {
    pub min_price: f64,
    /// Max distance from the base price, as a fraction
    pub band_pct: f64,
    /// Uniform noise amplitude per step, as a fraction
    pub volatility: f64,
}

pub struct SynthConfig {
    /// Ordered from the highest `min_price` down; the last tier catches everything
    pub tiers: [SynthTier; 4],
    pub trend_bias: f64,
    pub time_of_day_amplitude: f64,
    pub momentum_factor: f64,
}

pub const SYNTH: SynthConfig = SynthConfig {
    tiers: [
        SynthTier {
            min_price: 10_000.0,
            band_pct: 0.03,
            volatility: 0.004,
        },
        SynthTier {
            min_price: 100.0,
            band_pct: 0.05,
            volatility: 0.006,
        },
        SynthTier {
            min_price: 1.0,
            band_pct: 0.08,
            volatility: 0.008,
        },
        SynthTier {
            min_price: f64::NEG_INFINITY,
            band_pct: 0.12,
            volatility: 0.012,
        },
    ],
    trend_bias: 0.0008,
    time_of_day_amplitude: 0.0005,
    momentum_factor: 0.001,
};

impl SynthConfig {
    pub fn tier_for(&self, base_price: f64) -> &SynthTier {
        self.tiers
            .iter()
            .find(|t| base_price >= t.min_price)
            .unwrap_or(&self.tiers[self.tiers.len() - 1])
    }
}
