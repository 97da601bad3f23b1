//! Bars: one OHLCV record per symbol per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `ex_dividend` value meaning "no dividend on this day".
pub const DEFAULT_EX_DIVIDEND: f64 = 0.0;

/// `split_ratio` value meaning "no split on this day".
pub const DEFAULT_SPLIT_RATIO: f64 = 1.0;

/// Normalized daily row produced by the fetch stage.
///
/// OHLC are always present once a `RawBar` exists; rows with a missing field
/// are dropped before construction. `volume` stays nullable to mirror the
/// provider's integer coercion, but the fetch stage also drops null volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
    pub ex_dividend: f64,
    pub split_ratio: f64,
}

impl RawBar {
    /// A bar with the default "no corporate action" fields.
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open,
            high,
            low,
            close,
            volume: Some(volume),
            ex_dividend: DEFAULT_EX_DIVIDEND,
            split_ratio: DEFAULT_SPLIT_RATIO,
        }
    }

    /// True if this row carries a split (ratio differs from the sentinel).
    pub fn has_split(&self) -> bool {
        self.split_ratio != DEFAULT_SPLIT_RATIO
    }

    /// True if this row carries a dividend (amount differs from the sentinel).
    pub fn has_dividend(&self) -> bool {
        self.ex_dividend != DEFAULT_EX_DIVIDEND
    }

    /// Price/volume part of the row, as written to the bar store.
    pub fn to_daily(&self) -> DailyBar {
        DailyBar {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.unwrap_or(0),
        }
    }
}

/// OHLCV bar on one canonical session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl DailyBar {
    /// Placeholder for a session before the symbol's first observation.
    pub fn void(date: NaiveDate) -> Self {
        Self {
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: 0,
        }
    }

    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Same prices and volume, relabelled to another session.
    pub fn carried_to(&self, date: NaiveDate) -> Self {
        Self { date, ..self.clone() }
    }
}

/// One symbol's bars re-indexed onto the canonical session sequence.
///
/// `bars[i].date == sessions[i]` for the session slice it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBars {
    pub symbol: String,
    pub bars: Vec<DailyBar>,
}

impl SessionBars {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of sessions before the first real observation.
    pub fn leading_void_count(&self) -> usize {
        self.bars.iter().take_while(|b| b.is_void()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn new_bar_has_no_corporate_action() {
        let bar = RawBar::new("INFY", day(2), 100.0, 102.0, 99.0, 101.0, 1_000);
        assert!(!bar.has_split());
        assert!(!bar.has_dividend());
    }

    #[test]
    fn corporate_action_flags() {
        let mut bar = RawBar::new("INFY", day(2), 100.0, 102.0, 99.0, 101.0, 1_000);
        bar.split_ratio = 0.5;
        bar.ex_dividend = 2.5;
        assert!(bar.has_split());
        assert!(bar.has_dividend());
    }

    #[test]
    fn void_bar_detected() {
        assert!(DailyBar::void(day(3)).is_void());
        let bar = RawBar::new("TCS", day(3), 10.0, 11.0, 9.0, 10.5, 5).to_daily();
        assert!(!bar.is_void());
    }

    #[test]
    fn carried_bar_keeps_prices() {
        let bar = RawBar::new("TCS", day(3), 10.0, 11.0, 9.0, 10.5, 5).to_daily();
        let carried = bar.carried_to(day(4));
        assert_eq!(carried.date, day(4));
        assert_eq!(carried.close, 10.5);
        assert_eq!(carried.volume, 5);
    }

    #[test]
    fn leading_voids_counted() {
        let real = RawBar::new("TCS", day(4), 10.0, 11.0, 9.0, 10.5, 5).to_daily();
        let bars = SessionBars {
            symbol: "TCS".into(),
            bars: vec![DailyBar::void(day(2)), DailyBar::void(day(3)), real],
        };
        assert_eq!(bars.leading_void_count(), 2);
        assert_eq!(bars.len(), 3);
    }
}
