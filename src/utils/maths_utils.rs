/// Percentage change from `from` to `to`. Zero when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from.abs() < f64::EPSILON {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// Round to `decimals` places. Quote tables look silly with 15 digits of noise.
pub fn round_to(val: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (val * factor).round() / factor
}

/// Decimal places that keep a price readable for its magnitude (FX pips, sub-dollar coins)
pub fn price_decimals(price: f64) -> u32 {
    let p = price.abs();
    if p >= 1_000.0 {
        2
    } else if p >= 1.0 {
        4
    } else {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_change_handles_zero_base() {
        assert_eq!(percent_change(0.0, 10.0), 0.0);
        assert!((percent_change(100.0, 105.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_respects_magnitude() {
        assert_eq!(price_decimals(65_000.0), 2);
        assert_eq!(price_decimals(1.0845), 4);
        assert_eq!(price_decimals(0.0812), 6);
        assert_eq!(round_to(1.234567, 4), 1.2346);
    }
}
