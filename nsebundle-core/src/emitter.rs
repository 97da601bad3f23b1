//! Daily bar emitter.
//!
//! Re-indexes each mapped symbol onto the canonical session sequence and
//! yields `(sid, bars)` pairs lazily, in symbol-map order. Gaps are
//! forward-filled from the most recent prior session; sessions before the
//! symbol's first observation stay void. A symbol with no rows is skipped
//! with a warning and the remaining symbols are still emitted.

use crate::domain::{DailyBar, RawBar, SessionBars, Sid, SymbolMap};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// The combined table grouped by symbol, each symbol indexed by date.
#[derive(Debug, Default)]
pub struct BarIndex {
    by_symbol: HashMap<String, BTreeMap<NaiveDate, DailyBar>>,
}

impl BarIndex {
    /// Duplicate (symbol, date) rows keep the first occurrence.
    pub fn new(bars: &[RawBar]) -> Self {
        let mut by_symbol: HashMap<String, BTreeMap<NaiveDate, DailyBar>> = HashMap::new();
        for bar in bars {
            by_symbol
                .entry(bar.symbol.clone())
                .or_default()
                .entry(bar.date)
                .or_insert_with(|| bar.to_daily());
        }
        Self { by_symbol }
    }

    pub fn rows(&self, symbol: &str) -> Option<&BTreeMap<NaiveDate, DailyBar>> {
        self.by_symbol.get(symbol)
    }
}

/// Re-index one symbol's rows onto `sessions`, forward-filling gaps.
///
/// Rows on dates that are not sessions are dropped, as a reindex would.
/// The output has exactly one bar per session, dated with that session.
pub fn reindex_forward_fill(
    rows: &BTreeMap<NaiveDate, DailyBar>,
    sessions: &[NaiveDate],
) -> Vec<DailyBar> {
    let mut last: Option<&DailyBar> = None;
    sessions
        .iter()
        .map(|session| {
            if let Some(bar) = rows.get(session) {
                last = Some(bar);
                bar.carried_to(*session)
            } else {
                match last {
                    Some(prev) => prev.carried_to(*session),
                    None => DailyBar::void(*session),
                }
            }
        })
        .collect()
}

/// Lazy `(sid, bars)` producer over a symbol map.
///
/// Single pass; build a new emitter to run again.
pub struct DailyBarEmitter<'a> {
    index: &'a BarIndex,
    sessions: &'a [NaiveDate],
    pending: std::vec::IntoIter<(Sid, String)>,
    emitted: usize,
    skipped: Vec<String>,
}

impl<'a> DailyBarEmitter<'a> {
    pub fn new(index: &'a BarIndex, sessions: &'a [NaiveDate], symbols: &SymbolMap) -> Self {
        let pending: Vec<(Sid, String)> = symbols
            .iter()
            .map(|(sid, symbol)| (sid, symbol.to_string()))
            .collect();
        Self {
            index,
            sessions,
            pending: pending.into_iter(),
            emitted: 0,
            skipped: Vec::new(),
        }
    }

    /// Symbols skipped so far because they had no rows.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Iterator for DailyBarEmitter<'_> {
    type Item = (Sid, SessionBars);

    fn next(&mut self) -> Option<Self::Item> {
        for (sid, symbol) in self.pending.by_ref() {
            let rows = match self.index.rows(&symbol) {
                Some(rows) if !rows.is_empty() => rows,
                _ => {
                    tracing::warn!(symbol = symbol.as_str(), %sid, "no rows for symbol, skipping");
                    self.skipped.push(symbol);
                    continue;
                }
            };

            let bars = reindex_forward_fill(rows, self.sessions);
            tracing::debug!(
                symbol = symbol.as_str(),
                %sid,
                sessions = bars.len(),
                "reindexed"
            );
            self.emitted += 1;
            return Some((sid, SessionBars { symbol, bars }));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(symbol: &str, d: u32, close: f64) -> RawBar {
        RawBar::new(symbol, day(d), close - 1.0, close + 1.0, close - 2.0, close, 1_000 + d as u64)
    }

    #[test]
    fn full_coverage_is_unchanged() {
        let bars = vec![bar("A", 1, 10.0), bar("A", 2, 11.0), bar("A", 3, 12.0)];
        let index = BarIndex::new(&bars);
        let sessions = vec![day(1), day(2), day(3)];

        let out = reindex_forward_fill(index.rows("A").unwrap(), &sessions);
        let expected: Vec<DailyBar> = bars.iter().map(RawBar::to_daily).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn gaps_repeat_last_known_bar() {
        // Sessions D1..D4, data only at D1 and D3.
        let bars = vec![bar("A", 1, 10.0), bar("A", 3, 30.0)];
        let index = BarIndex::new(&bars);
        let sessions = vec![day(1), day(2), day(3), day(4)];

        let out = reindex_forward_fill(index.rows("A").unwrap(), &sessions);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1], bars[0].to_daily().carried_to(day(2)));
        assert_eq!(out[3], bars[1].to_daily().carried_to(day(4)));
        assert_eq!(out[1].volume, 1_001);
        assert_eq!(out[3].close, 30.0);
    }

    #[test]
    fn sessions_before_first_row_are_void() {
        let bars = vec![bar("A", 3, 30.0)];
        let index = BarIndex::new(&bars);
        let sessions = vec![day(1), day(2), day(3)];

        let out = reindex_forward_fill(index.rows("A").unwrap(), &sessions);
        assert!(out[0].is_void());
        assert!(out[1].is_void());
        assert_eq!(out[2].close, 30.0);
    }

    #[test]
    fn rows_off_calendar_are_dropped() {
        // Day 6 is a Saturday; not in the session list.
        let bars = vec![bar("A", 5, 10.0), bar("A", 6, 99.0)];
        let index = BarIndex::new(&bars);
        let sessions = vec![day(5), day(8)];

        let out = reindex_forward_fill(index.rows("A").unwrap(), &sessions);
        assert_eq!(out[1].close, 10.0);
        assert_eq!(out[1].date, day(8));
    }

    #[test]
    fn emits_in_symbol_map_order_and_skips_missing() {
        let bars = vec![bar("A", 1, 10.0), bar("C", 1, 12.0)];
        let index = BarIndex::new(&bars);
        let sessions = vec![day(1), day(2)];
        let map = SymbolMap::from_symbols(["C", "B", "A"]);

        let mut emitter = DailyBarEmitter::new(&index, &sessions, &map);
        let out: Vec<(Sid, SessionBars)> = emitter.by_ref().collect();

        let sids: Vec<Sid> = out.iter().map(|(sid, _)| *sid).collect();
        assert_eq!(sids, vec![Sid(0), Sid(2)]);
        assert_eq!(out[0].1.symbol, "C");
        assert!(out.iter().all(|(_, b)| b.len() == sessions.len()));
        assert_eq!(emitter.skipped(), ["B".to_string()]);
        assert_eq!(emitter.emitted(), 2);
    }

    #[test]
    fn emitter_is_lazy() {
        let bars = vec![bar("A", 1, 10.0), bar("B", 1, 12.0)];
        let index = BarIndex::new(&bars);
        let sessions = vec![day(1)];
        let map = SymbolMap::from_symbols(["A", "B"]);

        let mut emitter = DailyBarEmitter::new(&index, &sessions, &map);
        assert_eq!(emitter.emitted(), 0);
        assert!(emitter.next().is_some());
        assert_eq!(emitter.emitted(), 1);
    }

    #[test]
    fn duplicate_rows_keep_first() {
        let bars = vec![bar("A", 1, 10.0), bar("A", 1, 50.0)];
        let index = BarIndex::new(&bars);
        assert_eq!(index.rows("A").unwrap()[&day(1)].close, 10.0);
    }

    proptest! {
        /// Every output bar equals the input bar on the latest session at or
        /// before it, or is void when no such bar exists.
        #[test]
        fn forward_fill_uses_latest_prior(present in prop::collection::vec(any::<bool>(), 1..25)) {
            let sessions: Vec<NaiveDate> = (1..=present.len() as u32).map(day).collect();
            let bars: Vec<RawBar> = present
                .iter()
                .enumerate()
                .filter(|(_, p)| **p)
                .map(|(i, _)| bar("A", i as u32 + 1, 10.0 + i as f64))
                .collect();
            let index = BarIndex::new(&bars);
            let empty = BTreeMap::new();
            let rows = index.rows("A").unwrap_or(&empty);

            let out = reindex_forward_fill(rows, &sessions);
            prop_assert_eq!(out.len(), sessions.len());

            for (i, b) in out.iter().enumerate() {
                prop_assert_eq!(b.date, sessions[i]);
                match (0..=i).rev().find(|j| present[*j]) {
                    Some(j) => prop_assert_eq!(b.close, 10.0 + j as f64),
                    None => prop_assert!(b.is_void()),
                }
            }
        }
    }
}
