//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market-data sources (Yahoo Finance,
//! CSV directories) so the fetch stage can be driven by a mock in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for a single symbol's fetch.
///
/// The fetch stage never retries: each of these is final for the run.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no rows returned for {symbol}")]
    EmptyHistory { symbol: String },

    #[error("missing column '{column}' for {symbol}")]
    MissingColumn { symbol: String, column: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// One symbol's history as the provider returned it.
///
/// `columns` are provider-named (any case) and exclude the date index.
/// `rows[i]` lines up with `index[i]` and has one cell per column.
#[derive(Debug, Clone)]
pub struct ProviderFrame {
    pub symbol: String,
    pub source: DataSource,
    pub columns: Vec<String>,
    pub index: Vec<NaiveDate>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl ProviderFrame {
    pub fn new(symbol: impl Into<String>, source: DataSource, columns: Vec<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source,
            columns,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, date: NaiveDate, cells: Vec<Option<f64>>) {
        self.index.push(date);
        self.rows.push(cells);
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Trait for data providers.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV history for a symbol over a closed date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProviderFrame, DataError>;
}

/// Progress callback for multi-symbol fetches.
pub trait FetchProgress {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes. `Ok` carries the kept row count.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: Result<usize, &DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct TracingProgress;

impl FetchProgress for TracingProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::info!(symbol, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: Result<usize, &DataError>,
    ) {
        match result {
            Ok(rows) => tracing::info!(symbol, rows, "fetched"),
            Err(e) => tracing::debug!(symbol, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "fetch complete");
    }
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: Result<usize, &DataError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
