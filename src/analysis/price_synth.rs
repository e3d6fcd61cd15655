//! Synthetic price walks for sparklines and charts.
//!
//! Each step compounds `noise + bias + time_of_day + momentum` onto the previous
//! value, then clamps into the tier band around the base price. Randomness is
//! injected so callers pick entropy (UI) or a seeded generator (tests, replays).

use {
    crate::{
        config::{SYNTH, SynthTier},
        domain::{AssetQuote, QuoteSnapshot},
        utils::{day_fraction, now_timestamp_ms},
    },
    rand::Rng,
    std::f64::consts::TAU,
};

/// Walk of `points` values starting at `base_price`, phased to the current time of day.
pub fn generate_chart_data<R: Rng + ?Sized>(
    base_price: f64,
    is_positive: bool,
    points: usize,
    rng: &mut R,
) -> Vec<f64> {
    generate_chart_data_at(
        base_price,
        is_positive,
        points,
        day_fraction(now_timestamp_ms()),
        rng,
    )
}

/// Same as [`generate_chart_data`] with an explicit time-of-day phase in [0, 1).
pub fn generate_chart_data_at<R: Rng + ?Sized>(
    base_price: f64,
    is_positive: bool,
    points: usize,
    day_frac: f64,
    rng: &mut R,
) -> Vec<f64> {
    if points == 0 {
        return Vec::new();
    }
    if !base_price.is_finite() || base_price <= 0.0 {
        return vec![0.0; points];
    }

    let tier = SYNTH.tier_for(base_price);
    let (lower, upper) = band(base_price, tier);
    let direction = if is_positive { 1.0 } else { -1.0 };
    let n = points as f64;

    let mut series = Vec::with_capacity(points);
    let mut prev = base_price;
    series.push(prev);

    for i in 1..points {
        let progress = i as f64 / n;

        let noise = rng.gen_range(-tier.volatility..=tier.volatility);
        let bias = direction * SYNTH.trend_bias;
        let time_of_day = (TAU * (day_frac + progress)).sin() * SYNTH.time_of_day_amplitude;
        let momentum = direction * (progress - 0.5) * SYNTH.momentum_factor;

        let delta = noise + bias + time_of_day + momentum;
        prev = (prev * (1.0 + delta)).clamp(lower, upper);
        series.push(prev);
    }

    series
}

/// Inclusive [lower, upper] band a walk around `base_price` is clamped to
pub(crate) fn band(base_price: f64, tier: &SynthTier) -> (f64, f64) {
    (
        base_price * (1.0 - tier.band_pct),
        base_price * (1.0 + tier.band_pct),
    )
}

/// Market table rows with a sparkline per symbol, trend taken from the 24h change.
pub fn build_board<R: Rng + ?Sized>(
    snapshot: &QuoteSnapshot,
    points: usize,
    rng: &mut R,
) -> Vec<AssetQuote> {
    let phase = day_fraction(now_timestamp_ms());
    snapshot
        .quotes
        .iter()
        .map(|(symbol, quote)| {
            let spark = generate_chart_data_at(
                quote.price,
                quote.change_percent >= 0.0,
                points,
                phase,
                rng,
            );
            AssetQuote::from_market(symbol, quote, spark)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetClass, MarketQuote, QuoteMap, QuoteOrigin};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn every_point_stays_inside_its_tier_band() {
        for &base in &[65_000.0, 4_500.0, 180.0, 12.5, 1.0845, 0.0812] {
            let tier = SYNTH.tier_for(base);
            let (lower, upper) = band(base, tier);
            for seed in 0..50 {
                let mut rng = StdRng::seed_from_u64(seed);
                for trend in [true, false] {
                    let series = generate_chart_data_at(base, trend, 200, 0.3, &mut rng);
                    assert_eq!(series.len(), 200);
                    assert!(
                        series.iter().all(|&p| p >= lower && p <= upper),
                        "base {} seed {} escaped [{}, {}]",
                        base,
                        seed,
                        lower,
                        upper
                    );
                }
            }
        }
    }

    #[test]
    fn tiers_pick_by_magnitude() {
        assert_eq!(SYNTH.tier_for(65_000.0).band_pct, 0.03);
        assert_eq!(SYNTH.tier_for(150.0).band_pct, 0.05);
        assert_eq!(SYNTH.tier_for(1.2).band_pct, 0.08);
        assert_eq!(SYNTH.tier_for(0.5).band_pct, 0.12);
    }

    #[test]
    fn same_seed_same_walk() {
        let a = generate_chart_data_at(100.0, true, 30, 0.1, &mut StdRng::seed_from_u64(7));
        let b = generate_chart_data_at(100.0, true, 30, 0.1, &mut StdRng::seed_from_u64(7));
        let c = generate_chart_data_at(100.0, true, 30, 0.1, &mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn starts_at_base_price() {
        let series = generate_chart_data(250.0, false, 5, &mut StdRng::seed_from_u64(1));
        assert_eq!(series[0], 250.0);
    }

    #[test]
    fn degenerate_inputs_do_not_panic() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(generate_chart_data_at(100.0, true, 0, 0.0, &mut rng).is_empty());
        assert_eq!(generate_chart_data_at(-5.0, true, 3, 0.0, &mut rng), vec![0.0; 3]);
        assert_eq!(generate_chart_data_at(f64::NAN, true, 2, 0.0, &mut rng), vec![0.0; 2]);
        assert_eq!(generate_chart_data_at(f64::INFINITY, true, 3, 0.0, &mut rng), vec![0.0; 3]);
        assert_eq!(generate_chart_data_at(10.0, true, 1, 0.0, &mut rng), vec![10.0]);
    }

    #[test]
    fn trend_flag_biases_the_walk() {
        let mut up_sum = 0.0;
        let mut down_sum = 0.0;
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            up_sum += *generate_chart_data_at(100.0, true, 50, 0.0, &mut rng)
                .last()
                .unwrap();
            down_sum += *generate_chart_data_at(100.0, false, 50, 0.0, &mut rng)
                .last()
                .unwrap();
        }
        assert!(up_sum / 200.0 > 101.0);
        assert!(down_sum / 200.0 < 99.0);
    }

    #[test]
    fn board_rows_follow_quote_direction() {
        let mut quotes = QuoteMap::new();
        quotes.insert("AAPL".into(), MarketQuote::from_change_percent(190.0, 1.2, 10));
        quotes.insert("TSLA".into(), MarketQuote::from_change_percent(240.0, -2.0, 10));
        let snapshot = QuoteSnapshot {
            class: AssetClass::Stocks,
            quotes,
            origin: QuoteOrigin::Live,
        };

        let rows = build_board(&snapshot, 12, &mut StdRng::seed_from_u64(11));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAPL");
        assert!(rows[0].is_positive);
        assert!(!rows[1].is_positive);
        assert!(rows.iter().all(|r| r.sparkline.len() == 12));
    }
}
