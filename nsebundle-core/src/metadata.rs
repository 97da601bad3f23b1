//! Metadata generator: one `AssetMetadata` row per distinct symbol.

use crate::domain::{AssetMetadata, ExchangeInfo, RawBar};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Derive per-symbol date spans from the combined table.
///
/// Rows come out symbol-sorted, which is also the order sids are assigned in.
pub fn generate_metadata(bars: &[RawBar], exchange: &ExchangeInfo) -> Vec<AssetMetadata> {
    let mut spans: BTreeMap<&str, (NaiveDate, NaiveDate)> = BTreeMap::new();
    for bar in bars {
        spans
            .entry(bar.symbol.as_str())
            .and_modify(|(start, end)| {
                *start = (*start).min(bar.date);
                *end = (*end).max(bar.date);
            })
            .or_insert((bar.date, bar.date));
    }

    spans
        .into_iter()
        .map(|(symbol, (start, end))| AssetMetadata::new(symbol, start, end, &exchange.exchange))
        .collect()
}

/// The fixed exchange table written alongside the equities.
pub fn exchange_rows(exchange: &ExchangeInfo) -> Vec<ExchangeInfo> {
    vec![exchange.clone()]
}
