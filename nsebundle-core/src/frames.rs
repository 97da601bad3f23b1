//! Tabular forms of the bundle tables.
//!
//! Every table has a declared schema; an empty record set still produces a
//! zero-row frame carrying that schema, because writers need the columns.

use crate::domain::{AssetMetadata, DividendRecord, ExchangeInfo, SessionBars, SplitRecord};
use chrono::NaiveDate;
use polars::prelude::*;

/// Declared schemas for every table the pipeline emits.
pub struct BundleSchema;

impl BundleSchema {
    pub fn equities() -> Schema {
        Schema::from_iter(vec![
            Field::new("symbol".into(), DataType::String),
            Field::new("start_date".into(), DataType::Date),
            Field::new("end_date".into(), DataType::Date),
            Field::new("exchange".into(), DataType::String),
            Field::new("auto_close_date".into(), DataType::Date),
        ])
    }

    pub fn exchanges() -> Schema {
        Schema::from_iter(vec![
            Field::new("exchange".into(), DataType::String),
            Field::new("canonical_name".into(), DataType::String),
            Field::new("country_code".into(), DataType::String),
        ])
    }

    pub fn splits() -> Schema {
        Schema::from_iter(vec![
            Field::new("sid".into(), DataType::UInt32),
            Field::new("effective_date".into(), DataType::Date),
            Field::new("ratio".into(), DataType::Float64),
        ])
    }

    pub fn dividends() -> Schema {
        Schema::from_iter(vec![
            Field::new("sid".into(), DataType::UInt32),
            Field::new("ex_date".into(), DataType::Date),
            Field::new("amount".into(), DataType::Float64),
            Field::new("record_date".into(), DataType::Date),
            Field::new("declared_date".into(), DataType::Date),
            Field::new("pay_date".into(), DataType::Date),
        ])
    }

    pub fn daily_bars() -> Schema {
        Schema::from_iter(vec![
            Field::new("date".into(), DataType::Date),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::UInt64),
        ])
    }

    /// Validate a frame against a schema: same columns, same order, same dtypes.
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        let expected_order: Vec<String> = expected.iter_names().map(|n| n.to_string()).collect();
        let actual_order: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        if expected_order != actual_order {
            return Err(SchemaError::ColumnOrder {
                expected: expected_order,
                actual: actual_order,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Column order mismatch: expected {expected:?}, got {actual:?}")]
    ColumnOrder {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),
}

// ── Frame builders ──────────────────────────────────────────────────

pub fn equities_frame(assets: &[AssetMetadata]) -> Result<DataFrame, SchemaError> {
    let symbols: Vec<&str> = assets.iter().map(|a| a.symbol.as_str()).collect();
    let exchanges: Vec<&str> = assets.iter().map(|a| a.exchange.as_str()).collect();

    Ok(DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        date_column("start_date", assets.iter().map(|a| a.start_date))?,
        date_column("end_date", assets.iter().map(|a| a.end_date))?,
        Column::new("exchange".into(), exchanges),
        date_column("auto_close_date", assets.iter().map(|a| a.auto_close_date))?,
    ])?)
}

pub fn exchanges_frame(exchanges: &[ExchangeInfo]) -> Result<DataFrame, SchemaError> {
    let names: Vec<&str> = exchanges.iter().map(|e| e.exchange.as_str()).collect();
    let canonical: Vec<&str> = exchanges.iter().map(|e| e.canonical_name.as_str()).collect();
    let countries: Vec<&str> = exchanges.iter().map(|e| e.country_code.as_str()).collect();

    Ok(DataFrame::new(vec![
        Column::new("exchange".into(), names),
        Column::new("canonical_name".into(), canonical),
        Column::new("country_code".into(), countries),
    ])?)
}

/// `[sid, effective_date, ratio]`
pub fn splits_frame(splits: &[SplitRecord]) -> Result<DataFrame, SchemaError> {
    let sids: Vec<u32> = splits.iter().map(|s| s.sid.0).collect();
    let ratios: Vec<f64> = splits.iter().map(|s| s.ratio).collect();

    Ok(DataFrame::new(vec![
        Column::new("sid".into(), sids),
        date_column("effective_date", splits.iter().map(|s| s.effective_date))?,
        Column::new("ratio".into(), ratios),
    ])?)
}

/// `[sid, ex_date, amount, record_date, declared_date, pay_date]`
pub fn dividends_frame(dividends: &[DividendRecord]) -> Result<DataFrame, SchemaError> {
    let sids: Vec<u32> = dividends.iter().map(|d| d.sid.0).collect();
    let amounts: Vec<f64> = dividends.iter().map(|d| d.amount).collect();

    Ok(DataFrame::new(vec![
        Column::new("sid".into(), sids),
        date_column("ex_date", dividends.iter().map(|d| d.ex_date))?,
        Column::new("amount".into(), amounts),
        optional_date_column("record_date", dividends.iter().map(|d| d.record_date))?,
        optional_date_column("declared_date", dividends.iter().map(|d| d.declared_date))?,
        optional_date_column("pay_date", dividends.iter().map(|d| d.pay_date))?,
    ])?)
}

/// `[date, open, high, low, close, volume]` for one sid.
pub fn daily_bars_frame(bars: &SessionBars) -> Result<DataFrame, SchemaError> {
    let rows = &bars.bars;
    let opens: Vec<f64> = rows.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = rows.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = rows.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = rows.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = rows.iter().map(|b| b.volume).collect();

    Ok(DataFrame::new(vec![
        date_column("date", rows.iter().map(|b| b.date))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])?)
}

// ── Date helpers ────────────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Days since the Unix epoch, polars' physical representation of `Date`.
pub fn date_to_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

pub fn days_to_date(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(days as i64)
}

fn date_column(
    name: &str,
    dates: impl Iterator<Item = NaiveDate>,
) -> Result<Column, PolarsError> {
    let days: Vec<i32> = dates.map(date_to_days).collect();
    Column::new(name.into(), days).cast(&DataType::Date)
}

fn optional_date_column(
    name: &str,
    dates: impl Iterator<Item = Option<NaiveDate>>,
) -> Result<Column, PolarsError> {
    let days: Vec<Option<i32>> = dates.map(|d| d.map(date_to_days)).collect();
    Column::new(name.into(), days).cast(&DataType::Date)
}
