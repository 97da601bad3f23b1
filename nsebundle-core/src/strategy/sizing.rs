//! Fixed-fractional position sizing and percentage stops.
//!
//! For longs: stop = entry * (1 - stop_pct).
//! For shorts: stop = entry * (1 + stop_pct).

use crate::domain::DailyBar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

/// Whole shares such that hitting `stop` loses at most `risk_fraction` of equity.
///
/// # Formula
/// ```text
/// risk_amount = equity * risk_fraction
/// per_share   = |entry - stop|
/// quantity    = floor(risk_amount / per_share)
/// ```
///
/// Zero when the inputs cannot describe a risk-bounded trade.
pub fn fixed_fractional_quantity(equity: f64, risk_fraction: f64, entry: f64, stop: f64) -> u64 {
    let inputs = [equity, risk_fraction, entry, stop];
    if inputs.iter().any(|v| !v.is_finite()) || equity <= 0.0 || risk_fraction <= 0.0 {
        return 0;
    }

    let per_share = (entry - stop).abs();
    if per_share == 0.0 {
        return 0;
    }

    (equity * risk_fraction / per_share).floor() as u64
}

pub fn stop_loss_price(entry: f64, stop_pct: f64, side: Side) -> f64 {
    match side {
        Side::Long => entry * (1.0 - stop_pct),
        Side::Short => entry * (1.0 + stop_pct),
    }
}

/// Did the bar's range trade through the stop? Void bars never trigger.
pub fn is_stop_hit(side: Side, stop: f64, bar: &DailyBar) -> bool {
    if bar.is_void() {
        return false;
    }
    match side {
        Side::Long => bar.low <= stop,
        Side::Short => bar.high >= stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(low: f64, high: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: (low + high) / 2.0,
            high,
            low,
            close: (low + high) / 2.0,
            volume: 1000,
        }
    }

    #[test]
    fn one_percent_risk_with_five_rupee_stop() {
        // 1% of 1,00,000 = 1,000 at risk; 5 per share -> 200 shares
        assert_eq!(fixed_fractional_quantity(100_000.0, 0.01, 100.0, 95.0), 200);
    }

    #[test]
    fn quantity_is_floored() {
        assert_eq!(fixed_fractional_quantity(1_000.0, 0.01, 100.0, 97.0), 3);
    }

    #[test]
    fn degenerate_inputs_size_to_zero() {
        assert_eq!(fixed_fractional_quantity(100_000.0, 0.01, 100.0, 100.0), 0);
        assert_eq!(fixed_fractional_quantity(0.0, 0.01, 100.0, 95.0), 0);
        assert_eq!(fixed_fractional_quantity(100_000.0, 0.01, f64::NAN, 95.0), 0);
        assert_eq!(fixed_fractional_quantity(100_000.0, -0.01, 100.0, 95.0), 0);
    }

    #[test]
    fn short_stop_sizes_the_same() {
        assert_eq!(fixed_fractional_quantity(100_000.0, 0.01, 100.0, 105.0), 200);
    }

    #[test]
    fn stop_prices() {
        assert_eq!(stop_loss_price(100.0, 0.05, Side::Long), 95.0);
        assert_eq!(stop_loss_price(100.0, 0.05, Side::Short), 105.0);
    }

    #[test]
    fn stop_hit_by_range() {
        assert!(is_stop_hit(Side::Long, 95.0, &bar(94.0, 101.0)));
        assert!(!is_stop_hit(Side::Long, 95.0, &bar(96.0, 101.0)));
        assert!(is_stop_hit(Side::Short, 105.0, &bar(99.0, 105.0)));
        assert!(!is_stop_hit(Side::Short, 105.0, &bar(99.0, 104.0)));
    }

    #[test]
    fn void_bar_never_hits() {
        let void = DailyBar::void(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(!is_stop_hit(Side::Long, 95.0, &void));
        assert!(!is_stop_hit(Side::Short, 105.0, &void));
    }
}
