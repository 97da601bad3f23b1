//! Split and dividend parsers.
//!
//! Input rows are the subset of the combined table whose corporate-action
//! field deviates from its default, already carrying a resolved sid. The
//! default fetch path never sets those fields, so in practice both outputs
//! are usually empty; the frames still carry their declared columns.

use crate::domain::{DividendRecord, RawBar, Sid, SplitRecord, SymbolMap};
use chrono::NaiveDate;

/// A `RawBar`-derived row with its sid resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SidRow {
    pub sid: Sid,
    pub date: NaiveDate,
    pub ex_dividend: f64,
    pub split_ratio: f64,
}

/// Rows with `split_ratio != 1.0`, mapped to sids.
pub fn split_candidates(bars: &[RawBar], symbols: &SymbolMap) -> Vec<SidRow> {
    candidates(bars, symbols, RawBar::has_split)
}

/// Rows with `ex_dividend != 0.0`, mapped to sids.
pub fn dividend_candidates(bars: &[RawBar], symbols: &SymbolMap) -> Vec<SidRow> {
    candidates(bars, symbols, RawBar::has_dividend)
}

fn candidates(bars: &[RawBar], symbols: &SymbolMap, keep: fn(&RawBar) -> bool) -> Vec<SidRow> {
    bars.iter()
        .filter(|b| keep(b))
        .filter_map(|b| match symbols.sid(&b.symbol) {
            Some(sid) => Some(SidRow {
                sid,
                date: b.date,
                ex_dividend: b.ex_dividend,
                split_ratio: b.split_ratio,
            }),
            None => {
                tracing::warn!(
                    symbol = b.symbol.as_str(),
                    date = %b.date,
                    "no sid for adjustment row"
                );
                None
            }
        })
        .collect()
}

/// `effective_date = date`, `ratio = 1 / split_ratio`.
pub fn parse_splits(rows: &[SidRow]) -> Vec<SplitRecord> {
    rows.iter()
        .map(|r| SplitRecord {
            sid: r.sid,
            effective_date: r.date,
            ratio: 1.0 / r.split_ratio,
        })
        .collect()
}

/// `amount = ex_dividend`, `ex_date = date`; the other dates are unknown.
pub fn parse_dividends(rows: &[SidRow]) -> Vec<DividendRecord> {
    rows.iter()
        .map(|r| DividendRecord {
            sid: r.sid,
            ex_date: r.date,
            amount: r.ex_dividend,
            record_date: None,
            declared_date: None,
            pay_date: None,
        })
        .collect()
}
