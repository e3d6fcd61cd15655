//! Pure trade admission rules. No I/O; the desk feeds in the current balance.
use {
    super::error::TradeError,
    crate::domain::{Timeframe, TradeRequest},
};

/// Amount must be finite, positive and inside the timeframe's inclusive window.
pub fn check_amount(amount: f64, timeframe: Timeframe) -> Result<(), TradeError> {
    let (min, max) = timeframe.amount_bounds();
    if !amount.is_finite() || amount <= 0.0 || amount < min || amount > max {
        return Err(TradeError::InvalidAmount {
            timeframe,
            min,
            max,
            amount,
        });
    }
    Ok(())
}

pub fn check_balance(amount: f64, balance: f64) -> Result<(), TradeError> {
    if amount > balance {
        return Err(TradeError::InsufficientFunds {
            required: amount,
            available: balance,
            shortfall: amount - balance,
        });
    }
    Ok(())
}

/// Bounds first, then funds. Returns the balance after the deduction.
pub fn validate(req: &TradeRequest, balance: f64) -> Result<f64, TradeError> {
    check_amount(req.amount, req.timeframe)?;
    check_balance(req.amount, balance)?;
    Ok(balance - req.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeDirection;

    fn req(amount: f64, timeframe: Timeframe) -> TradeRequest {
        TradeRequest {
            symbol: "EURUSD".into(),
            amount,
            timeframe,
            direction: TradeDirection::Buy,
            open_price: 1.0845,
        }
    }

    #[test]
    fn thirty_day_window_is_inclusive() {
        assert!(check_amount(100_000.0, Timeframe::ThirtyDays).is_ok());
        assert!(check_amount(499_999.0, Timeframe::ThirtyDays).is_ok());

        for amount in [99_999.0, 500_000.0] {
            match check_amount(amount, Timeframe::ThirtyDays) {
                Err(TradeError::InvalidAmount { min, max, .. }) => {
                    assert_eq!((min, max), (100_000.0, 499_999.0));
                }
                other => panic!("expected InvalidAmount for {amount}, got {other:?}"),
            }
        }
    }

    #[test]
    fn garbage_amounts_are_invalid() {
        for amount in [f64::NAN, f64::INFINITY, -5_000.0, 0.0] {
            assert_eq!(check_amount(amount, Timeframe::OneDay).unwrap_err().code(), "INVALID_AMOUNT");
        }
    }

    #[test]
    fn shortfall_is_amount_minus_balance() {
        match validate(&req(3_000.0, Timeframe::OneDay), 1_200.0) {
            Err(TradeError::InsufficientFunds {
                required,
                available,
                shortfall,
            }) => {
                assert_eq!(required, 3_000.0);
                assert_eq!(available, 1_200.0);
                assert_eq!(shortfall, 1_800.0);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn bounds_are_checked_before_funds() {
        let err = validate(&req(500.0, Timeframe::OneDay), 0.0).unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
    }

    #[test]
    fn accepted_request_returns_remaining_balance() {
        assert_eq!(validate(&req(3_000.0, Timeframe::OneDay), 5_000.0).unwrap(), 2_000.0);
        // Spending the whole balance is allowed
        assert_eq!(validate(&req(9_999.0, Timeframe::OneDay), 9_999.0).unwrap(), 0.0);
    }
}
