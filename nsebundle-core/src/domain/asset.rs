//! Asset and exchange metadata rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Static exchange descriptor written next to the equities table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub exchange: String,
    pub canonical_name: String,
    pub country_code: String,
}

impl ExchangeInfo {
    /// National Stock Exchange of India.
    pub fn nse() -> Self {
        Self {
            exchange: "NSE".into(),
            canonical_name: "NSE".into(),
            country_code: "IN".into(),
        }
    }
}

impl Default for ExchangeInfo {
    fn default() -> Self {
        Self::nse()
    }
}

/// One row per symbol: the span of sessions the symbol has data for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub exchange: String,
    /// Day after `end_date`; the asset is delisted from the dataset's view here.
    pub auto_close_date: NaiveDate,
}

impl AssetMetadata {
    pub fn new(
        symbol: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        exchange: &str,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            start_date: start,
            end_date: end,
            exchange: exchange.to_string(),
            auto_close_date: end + chrono::Duration::days(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_close_is_day_after_end() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let meta = AssetMetadata::new("SBIN", start, end, "NSE");
        assert_eq!(
            meta.auto_close_date,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }
}
