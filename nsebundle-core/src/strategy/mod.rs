//! Strategy interface over ingested session bars.
//!
//! A strategy picks a universe and produces target weights once per session.
//! Lifecycle hooks are optional. Built-in strategies are variants of
//! `StrategyKind` and are dispatched with a plain `match`.

pub mod sizing;

pub use sizing::{fixed_fractional_quantity, is_stop_hit, stop_loss_price, Side};

use crate::domain::{DailyBar, SessionBars};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a strategy can see at one session.
///
/// Every `SessionBars` shares the same session axis; only bars at or before
/// `session_index` are visible.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub session: NaiveDate,
    pub session_index: usize,
    pub equity: f64,
    bars: &'a [SessionBars],
}

impl<'a> StrategyContext<'a> {
    pub fn new(bars: &'a [SessionBars], session_index: usize, equity: f64) -> Option<Self> {
        let session = bars.first()?.bars.get(session_index)?.date;
        Some(Self {
            session,
            session_index,
            equity,
            bars,
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.bars.iter().map(|b| b.symbol.as_str())
    }

    /// The bar `offset` sessions before the current one.
    pub fn bar(&self, symbol: &str, offset: usize) -> Option<&'a DailyBar> {
        let index = self.session_index.checked_sub(offset)?;
        self.bars
            .iter()
            .find(|b| b.symbol == symbol)?
            .bars
            .get(index)
    }

    /// Close `offset` sessions back, if that bar carries a price.
    pub fn close(&self, symbol: &str, offset: usize) -> Option<f64> {
        self.bar(symbol, offset)
            .filter(|b| !b.is_void())
            .map(|b| b.close)
    }

    /// Symbols with a priced bar at the current session, sorted.
    pub fn tradable(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .symbols()
            .filter(|s| self.close(s, 0).is_some())
            .map(String::from)
            .collect();
        out.sort();
        out
    }
}

/// Portfolio weights by symbol. Absent means zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetWeights(BTreeMap<String, f64>);

impl TargetWeights {
    /// Equal weight across `symbols`, summing to 1.
    pub fn equal(symbols: &[String]) -> Self {
        if symbols.is_empty() {
            return Self::default();
        }
        let w = 1.0 / symbols.len() as f64;
        Self(symbols.iter().map(|s| (s.clone(), w)).collect())
    }

    pub fn get(&self, symbol: &str) -> f64 {
        self.0.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(s, w)| (s.as_str(), *w))
    }
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// Symbols eligible at this session.
    fn select_universe(&self, ctx: &StrategyContext) -> Vec<String>;

    fn generate_signals(&self, ctx: &StrategyContext) -> TargetWeights;

    fn on_start(&mut self, _ctx: &StrategyContext) {}

    fn before_session(&mut self, _ctx: &StrategyContext) {}

    fn after_session(&mut self, _ctx: &StrategyContext, _weights: &TargetWeights) {}

    fn on_finish(&mut self, _ctx: &StrategyContext) {}
}

/// Equal weight over the first `max_positions` tradable symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualWeight {
    pub max_positions: usize,
}

impl Strategy for EqualWeight {
    fn name(&self) -> &str {
        "equal_weight"
    }

    fn select_universe(&self, ctx: &StrategyContext) -> Vec<String> {
        let mut symbols = ctx.tradable();
        symbols.truncate(self.max_positions);
        symbols
    }

    fn generate_signals(&self, ctx: &StrategyContext) -> TargetWeights {
        TargetWeights::equal(&self.select_universe(ctx))
    }
}

/// Equal weight over the `top_n` symbols with the highest positive
/// `lookback`-session return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub lookback: usize,
    pub top_n: usize,
}

impl Momentum {
    /// close[t] / close[t - lookback] - 1
    pub fn score(&self, ctx: &StrategyContext, symbol: &str) -> Option<f64> {
        let now = ctx.close(symbol, 0)?;
        let then = ctx.close(symbol, self.lookback)?;
        if then <= 0.0 {
            return None;
        }
        Some(now / then - 1.0)
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    /// Symbols with a full lookback window.
    fn select_universe(&self, ctx: &StrategyContext) -> Vec<String> {
        ctx.tradable()
            .into_iter()
            .filter(|s| self.score(ctx, s).is_some())
            .collect()
    }

    fn generate_signals(&self, ctx: &StrategyContext) -> TargetWeights {
        let mut scored: Vec<(String, f64)> = self
            .select_universe(ctx)
            .into_iter()
            .filter_map(|s| self.score(ctx, &s).map(|score| (s, score)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Highest first; ties broken by symbol for determinism.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(self.top_n);

        let picks: Vec<String> = scored.into_iter().map(|(s, _)| s).collect();
        TargetWeights::equal(&picks)
    }
}

/// Built-in strategies (serializable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    EqualWeight(EqualWeight),
    Momentum(Momentum),
}

impl StrategyKind {
    pub fn equal_weight(max_positions: usize) -> Self {
        StrategyKind::EqualWeight(EqualWeight { max_positions })
    }

    pub fn momentum(lookback: usize, top_n: usize) -> Self {
        StrategyKind::Momentum(Momentum { lookback, top_n })
    }
}

impl Strategy for StrategyKind {
    fn name(&self) -> &str {
        match self {
            StrategyKind::EqualWeight(s) => s.name(),
            StrategyKind::Momentum(s) => s.name(),
        }
    }

    fn select_universe(&self, ctx: &StrategyContext) -> Vec<String> {
        match self {
            StrategyKind::EqualWeight(s) => s.select_universe(ctx),
            StrategyKind::Momentum(s) => s.select_universe(ctx),
        }
    }

    fn generate_signals(&self, ctx: &StrategyContext) -> TargetWeights {
        match self {
            StrategyKind::EqualWeight(s) => s.generate_signals(ctx),
            StrategyKind::Momentum(s) => s.generate_signals(ctx),
        }
    }
}

/// Drive a strategy across every session, calling each lifecycle hook.
///
/// Returns one `(session, weights)` entry per session.
pub fn run_sessions(
    strategy: &mut dyn Strategy,
    bars: &[SessionBars],
    equity: f64,
) -> Vec<(NaiveDate, TargetWeights)> {
    let sessions = bars.first().map(SessionBars::len).unwrap_or(0);
    let mut out = Vec::with_capacity(sessions);

    let Some(first) = StrategyContext::new(bars, 0, equity) else {
        return out;
    };
    strategy.on_start(&first);

    let mut last = first;
    for index in 0..sessions {
        let Some(ctx) = StrategyContext::new(bars, index, equity) else {
            break;
        };
        strategy.before_session(&ctx);
        let weights = strategy.generate_signals(&ctx);
        strategy.after_session(&ctx, &weights);
        out.push((ctx.session, weights));
        last = ctx;
    }

    strategy.on_finish(&last);
    tracing::debug!(strategy = strategy.name(), sessions = out.len(), "strategy run complete");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn series(symbol: &str, closes: &[f64]) -> SessionBars {
        SessionBars {
            symbol: symbol.into(),
            bars: closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let date = day(i as u32 + 1);
                    if c.is_nan() {
                        DailyBar::void(date)
                    } else {
                        DailyBar {
                            date,
                            open: c,
                            high: c,
                            low: c,
                            close: c,
                            volume: 100,
                        }
                    }
                })
                .collect(),
        }
    }

    fn universe() -> Vec<SessionBars> {
        vec![
            series("A", &[100.0, 105.0, 110.0]),
            series("B", &[100.0, 98.0, 95.0]),
            series("C", &[f64::NAN, 50.0, 60.0]),
        ]
    }

    #[test]
    fn context_hides_future_and_void() {
        let bars = universe();
        let ctx = StrategyContext::new(&bars, 1, 1.0).unwrap();
        assert_eq!(ctx.session, day(2));
        assert_eq!(ctx.close("A", 0), Some(105.0));
        assert_eq!(ctx.close("A", 1), Some(100.0));
        assert_eq!(ctx.close("A", 2), None);
        assert_eq!(ctx.close("C", 1), None);
        assert_eq!(ctx.close("ZZZ", 0), None);
    }

    #[test]
    fn equal_weight_caps_positions() {
        let bars = universe();
        let ctx = StrategyContext::new(&bars, 2, 1.0).unwrap();
        let weights = StrategyKind::equal_weight(2).generate_signals(&ctx);
        assert_eq!(weights.len(), 2);
        assert_eq!(weights.get("A"), 0.5);
        assert_eq!(weights.get("B"), 0.5);
        assert_eq!(weights.get("C"), 0.0);
    }

    #[test]
    fn equal_weight_skips_unpriced_symbols() {
        let bars = universe();
        let ctx = StrategyContext::new(&bars, 0, 1.0).unwrap();
        let universe = StrategyKind::equal_weight(10).select_universe(&ctx);
        assert_eq!(universe, vec!["A", "B"]);
    }

    #[test]
    fn momentum_picks_positive_leaders() {
        let bars = universe();
        let ctx = StrategyContext::new(&bars, 2, 1.0).unwrap();
        let strategy = StrategyKind::momentum(1, 1);
        // A: 110/105-1 ~ 4.8%, C: 60/50-1 = 20%, B negative
        let weights = strategy.generate_signals(&ctx);
        assert_eq!(weights.len(), 1);
        assert_eq!(weights.get("C"), 1.0);
    }

    #[test]
    fn momentum_needs_full_lookback() {
        let bars = universe();
        let ctx = StrategyContext::new(&bars, 1, 1.0).unwrap();
        let strategy = StrategyKind::momentum(2, 3);
        assert!(strategy.select_universe(&ctx).is_empty());
        assert!(strategy.generate_signals(&ctx).is_empty());
    }

    #[test]
    fn weights_sum_to_one_when_invested() {
        let bars = universe();
        let ctx = StrategyContext::new(&bars, 2, 1.0).unwrap();
        let total = StrategyKind::equal_weight(3).generate_signals(&ctx).total();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Strategy for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn select_universe(&self, ctx: &StrategyContext) -> Vec<String> {
            ctx.tradable()
        }
        fn generate_signals(&self, ctx: &StrategyContext) -> TargetWeights {
            TargetWeights::equal(&self.select_universe(ctx))
        }
        fn on_start(&mut self, _ctx: &StrategyContext) {
            self.events.push("start".into());
        }
        fn before_session(&mut self, ctx: &StrategyContext) {
            self.events.push(format!("before {}", ctx.session_index));
        }
        fn after_session(&mut self, ctx: &StrategyContext, _w: &TargetWeights) {
            self.events.push(format!("after {}", ctx.session_index));
        }
        fn on_finish(&mut self, ctx: &StrategyContext) {
            self.events.push(format!("finish {}", ctx.session_index));
        }
    }

    #[test]
    fn lifecycle_hooks_run_in_order() {
        let bars = universe();
        let mut recorder = Recorder::default();
        let out = run_sessions(&mut recorder, &bars, 1.0);

        assert_eq!(out.len(), 3);
        assert_eq!(
            recorder.events,
            vec![
                "start", "before 0", "after 0", "before 1", "after 1", "before 2", "after 2",
                "finish 2"
            ]
        );
    }

    #[test]
    fn no_bars_no_sessions() {
        let mut strategy = StrategyKind::equal_weight(1);
        assert!(run_sessions(&mut strategy, &[], 1.0).is_empty());
    }

    #[test]
    fn strategy_kind_serde_is_tagged() {
        let json = serde_json::to_string(&StrategyKind::momentum(20, 5)).unwrap();
        assert_eq!(json, r#"{"type":"momentum","lookback":20,"top_n":5}"#);
        let back: StrategyKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StrategyKind::momentum(20, 5));
    }
}
