//! Raw data fetcher: runs every symbol through the provider and normalizes
//! the result into one combined `RawBar` table.
//!
//! Per-symbol failures are recorded and skipped. Only a batch in which no
//! symbol produced a usable row is an error.

use super::provider::{DataError, DataProvider, FetchProgress, ProviderFrame};
use crate::domain::{RawBar, DEFAULT_EX_DIVIDEND, DEFAULT_SPLIT_RATIO};
use chrono::NaiveDate;
use thiserror::Error;

/// Lowercased column names the normalizer requires.
pub const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("symbol universe is empty")]
    EmptyUniverse,

    #[error("no symbol yielded data ({} failed)", .failed.len())]
    AllSymbolsFailed { failed: Vec<(String, DataError)> },
}

/// Result of a batch fetch with at least one successful symbol.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Combined table, sorted by (date, symbol).
    pub bars: Vec<RawBar>,
    /// Symbols that produced no usable rows, with the reason.
    pub failed: Vec<(String, DataError)>,
    /// Rows discarded for missing OHLCV values, across all symbols.
    pub dropped_rows: usize,
}

impl FetchOutcome {
    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failed.iter().map(|(s, _)| s.as_str()).collect()
    }
}

/// Fetch and normalize every symbol in order, one request at a time.
pub fn fetch_raw_bars(
    provider: &dyn DataProvider,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn FetchProgress,
) -> Result<FetchOutcome, FetchError> {
    if symbols.is_empty() {
        return Err(FetchError::EmptyUniverse);
    }

    let total = symbols.len();
    let mut bars = Vec::new();
    let mut failed: Vec<(String, DataError)> = Vec::new();
    let mut dropped_rows = 0;

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        let result = provider
            .fetch(symbol, start, end)
            .and_then(normalize_frame);

        match result {
            Ok(normalized) => {
                dropped_rows += normalized.dropped;
                if normalized.dropped > 0 {
                    tracing::debug!(
                        symbol = symbol.as_str(),
                        dropped = normalized.dropped,
                        "dropped incomplete rows"
                    );
                }
                progress.on_complete(symbol, i, total, Ok(normalized.bars.len()));
                bars.extend(normalized.bars);
            }
            Err(e) => {
                tracing::warn!(symbol = symbol.as_str(), error = %e, "symbol failed, skipping");
                progress.on_complete(symbol, i, total, Err(&e));
                failed.push((symbol.clone(), e));
            }
        }
    }

    let succeeded = total - failed.len();
    progress.on_batch_complete(succeeded, failed.len(), total);

    if succeeded == 0 {
        tracing::error!(total, "every symbol failed to fetch");
        return Err(FetchError::AllSymbolsFailed { failed });
    }

    bars.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));

    Ok(FetchOutcome {
        bars,
        failed,
        dropped_rows,
    })
}

/// Rows kept from one provider frame.
#[derive(Debug)]
pub struct NormalizedBars {
    pub bars: Vec<RawBar>,
    pub dropped: usize,
}

/// Normalize one provider frame into `RawBar`s.
///
/// Lowercases column names, attaches the symbol and default corporate-action
/// fields, coerces volume to an integer and drops any row with a missing
/// OHLCV value. A frame that ends up with no rows is an `EmptyHistory` error.
pub fn normalize_frame(frame: ProviderFrame) -> Result<NormalizedBars, DataError> {
    let symbol = frame.symbol;
    if frame.index.is_empty() {
        return Err(DataError::EmptyHistory { symbol });
    }

    let lowered: Vec<String> = frame.columns.iter().map(|c| c.to_lowercase()).collect();
    let mut positions = [0usize; 5];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = lowered
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::MissingColumn {
                symbol: symbol.clone(),
                column: name.to_string(),
            })?;
    }
    let [open_at, high_at, low_at, close_at, volume_at] = positions;

    let mut bars = Vec::with_capacity(frame.index.len());
    let mut dropped = 0;

    for (date, row) in frame.index.into_iter().zip(frame.rows) {
        let cell = |at: usize| row.get(at).copied().flatten().filter(|v| v.is_finite());
        let parsed = (
            cell(open_at),
            cell(high_at),
            cell(low_at),
            cell(close_at),
            cell(volume_at).and_then(coerce_volume),
        );
        match parsed {
            (Some(open), Some(high), Some(low), Some(close), Some(volume)) => bars.push(RawBar {
                symbol: symbol.clone(),
                date,
                open,
                high,
                low,
                close,
                volume: Some(volume),
                ex_dividend: DEFAULT_EX_DIVIDEND,
                split_ratio: DEFAULT_SPLIT_RATIO,
            }),
            _ => dropped += 1,
        }
    }

    if bars.is_empty() {
        return Err(DataError::EmptyHistory { symbol });
    }

    Ok(NormalizedBars { bars, dropped })
}

/// Nullable-integer coercion: negative or fractional volumes become null.
fn coerce_volume(v: f64) -> Option<u64> {
    if v < 0.0 || v.fract() != 0.0 || v > u64::MAX as f64 {
        return None;
    }
    Some(v as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, NoProgress};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn frame(columns: &[&str], rows: Vec<(u32, Vec<Option<f64>>)>) -> ProviderFrame {
        let mut f = ProviderFrame::new(
            "TCS",
            DataSource::Synthetic,
            columns.iter().map(|c| c.to_string()).collect(),
        );
        for (d, cells) in rows {
            f.push_row(day(d), cells);
        }
        f
    }

    fn full(v: f64) -> Vec<Option<f64>> {
        vec![Some(v), Some(v + 1.0), Some(v - 1.0), Some(v), Some(100.0)]
    }

    #[test]
    fn column_names_are_case_insensitive() {
        let f = frame(&["OPEN", "High", "low", "Close", "VoLuMe"], vec![(2, full(10.0))]);
        let out = normalize_frame(f).unwrap();
        assert_eq!(out.bars.len(), 1);
        assert_eq!(out.bars[0].high, 11.0);
        assert_eq!(out.bars[0].volume, Some(100));
    }

    #[test]
    fn defaults_are_attached() {
        let f = frame(&["Open", "High", "Low", "Close", "Volume"], vec![(2, full(10.0))]);
        let bar = &normalize_frame(f).unwrap().bars[0];
        assert_eq!(bar.symbol, "TCS");
        assert_eq!(bar.ex_dividend, 0.0);
        assert_eq!(bar.split_ratio, 1.0);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let f = frame(
            &["Adj Close", "Open", "High", "Low", "Close", "Volume"],
            vec![(2, vec![Some(1.0), Some(10.0), Some(11.0), Some(9.0), Some(10.0), Some(5.0)])],
        );
        let bar = &normalize_frame(f).unwrap().bars[0];
        assert_eq!(bar.open, 10.0);
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let mut missing_close = full(10.0);
        missing_close[3] = None;
        let mut nan_open = full(10.0);
        nan_open[0] = Some(f64::NAN);
        let f = frame(
            &["Open", "High", "Low", "Close", "Volume"],
            vec![(2, full(10.0)), (3, missing_close), (4, nan_open), (5, full(12.0))],
        );
        let out = normalize_frame(f).unwrap();
        assert_eq!(out.bars.len(), 2);
        assert_eq!(out.dropped, 2);
        assert_eq!(out.bars[1].date, day(5));
    }

    #[test]
    fn fractional_volume_drops_row() {
        let mut fractional = full(10.0);
        fractional[4] = Some(10.5);
        let f = frame(
            &["Open", "High", "Low", "Close", "Volume"],
            vec![(2, fractional), (3, full(10.0))],
        );
        let out = normalize_frame(f).unwrap();
        assert_eq!(out.bars.len(), 1);
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn missing_required_column_is_error() {
        let f = frame(&["Open", "High", "Low", "Close"], vec![(2, vec![Some(1.0); 4])]);
        match normalize_frame(f) {
            Err(DataError::MissingColumn { column, .. }) => assert_eq!(column, "volume"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn all_rows_dropped_is_empty_history() {
        let f = frame(
            &["Open", "High", "Low", "Close", "Volume"],
            vec![(2, vec![None; 5])],
        );
        assert!(matches!(normalize_frame(f), Err(DataError::EmptyHistory { .. })));
    }

    #[test]
    fn volume_coercion() {
        assert_eq!(coerce_volume(1500.0), Some(1500));
        assert_eq!(coerce_volume(-1.0), None);
        assert_eq!(coerce_volume(1.25), None);
    }

    /// Returns a zero-row frame for every symbol listed as empty.
    struct EmptyFor(Vec<&'static str>);

    impl DataProvider for EmptyFor {
        fn name(&self) -> &str {
            "empty_for"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<ProviderFrame, DataError> {
            let mut f = ProviderFrame::new(
                symbol,
                DataSource::Synthetic,
                ["Open", "High", "Low", "Close", "Volume"].map(String::from).to_vec(),
            );
            if !self.0.iter().any(|e| *e == symbol) {
                f.push_row(start, full(10.0));
            }
            Ok(f)
        }
    }

    fn universe(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_frames_are_recorded_as_failed() {
        let provider = EmptyFor(vec!["HDFC", "WIPRO"]);
        let symbols = universe(&["TCS", "HDFC", "INFY", "WIPRO", "ITC"]);

        let outcome = fetch_raw_bars(&provider, &symbols, day(1), day(2), &NoProgress).unwrap();

        assert_eq!(outcome.failed_symbols(), vec!["HDFC", "WIPRO"]);
        assert!(outcome
            .failed
            .iter()
            .all(|(_, e)| matches!(e, DataError::EmptyHistory { .. })));
        let kept: Vec<&str> = outcome.bars.iter().map(|b| b.symbol.as_str()).collect();
        assert_eq!(kept, vec!["INFY", "ITC", "TCS"]);
    }

    #[test]
    fn every_frame_empty_is_fatal() {
        let provider = EmptyFor(vec!["TCS", "INFY"]);
        let symbols = universe(&["TCS", "INFY"]);

        match fetch_raw_bars(&provider, &symbols, day(1), day(2), &NoProgress) {
            Err(FetchError::AllSymbolsFailed { failed }) => {
                let names: Vec<&str> = failed.iter().map(|(s, _)| s.as_str()).collect();
                assert_eq!(names, vec!["TCS", "INFY"]);
            }
            other => panic!("expected AllSymbolsFailed, got {other:?}"),
        }
    }

    #[test]
    fn empty_universe_is_rejected() {
        struct Never;
        impl DataProvider for Never {
            fn name(&self) -> &str {
                "never"
            }
            fn fetch(
                &self,
                _: &str,
                _: NaiveDate,
                _: NaiveDate,
            ) -> Result<ProviderFrame, DataError> {
                unreachable!()
            }
        }
        let result = fetch_raw_bars(&Never, &[], day(1), day(2), &NoProgress);
        assert!(matches!(result, Err(FetchError::EmptyUniverse)));
    }
}
