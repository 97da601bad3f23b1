//! End-to-end ingest: fetch, metadata, calendar reindex, adjustments, write.
//!
//! Stateless between runs. The only fatal data condition is a fetch stage
//! in which no symbol produced rows; everything else is logged and skipped.

use crate::adjustments::{dividend_candidates, parse_dividends, parse_splits, split_candidates};
use crate::calendar::{CalendarError, TradingCalendar};
use crate::config::{BundleConfig, ConfigError, ProviderConfig};
use crate::data::{
    fetch_raw_bars, CsvProvider, DataError, DataProvider, FetchError, FetchProgress, YahooProvider,
};
use crate::domain::RawBar;
use crate::emitter::{BarIndex, DailyBarEmitter};
use crate::metadata::{exchange_rows, generate_metadata};
use crate::writer::{BundleWriter, WriterError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("provider setup failed: {0}")]
    Provider(#[from] DataError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("calendar: {0}")]
    Calendar(#[from] CalendarError),

    #[error("writer: {0}")]
    Writer(#[from] WriterError),
}

/// A symbol the fetch stage gave up on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub requested: Vec<String>,
    /// Symbols with at least one bar written, in sid order.
    pub ingested: Vec<String>,
    pub failed: Vec<FailedSymbol>,
    /// Mapped symbols the emitter had no rows for.
    pub skipped: Vec<String>,
    pub sessions: usize,
    pub bar_rows: usize,
    pub dropped_rows: usize,
    pub splits: usize,
    pub dividends: usize,
}

/// Build the provider named by the config.
pub fn provider_from_config(config: &ProviderConfig) -> Result<Box<dyn DataProvider>, DataError> {
    match config {
        ProviderConfig::Yahoo { suffix } => Ok(Box::new(YahooProvider::new(suffix.as_str())?)),
        ProviderConfig::Csv { dir } => Ok(Box::new(CsvProvider::new(dir.clone()))),
    }
}

/// Run the whole pipeline for one config.
pub fn ingest(
    config: &BundleConfig,
    provider: &dyn DataProvider,
    calendar: &dyn TradingCalendar,
    writer: &mut dyn BundleWriter,
    progress: &dyn FetchProgress,
) -> Result<IngestSummary, PipelineError> {
    config.validate()?;
    tracing::info!(
        provider = provider.name(),
        calendar = calendar.name(),
        symbols = config.symbol_universe.len(),
        start = %config.start_date,
        end = %config.end_date,
        "ingest starting"
    );

    let outcome = fetch_raw_bars(
        provider,
        &config.symbol_universe,
        config.start_date,
        config.end_date,
        progress,
    )?;

    let mut summary = write_bundle(&outcome.bars, config, calendar, writer)?;
    summary.requested = config.symbol_universe.clone();
    summary.dropped_rows = outcome.dropped_rows;
    summary.failed = outcome
        .failed
        .iter()
        .map(|(symbol, e)| FailedSymbol {
            symbol: symbol.clone(),
            reason: e.to_string(),
        })
        .collect();

    for failed in &summary.failed {
        tracing::warn!(
            symbol = failed.symbol.as_str(),
            reason = failed.reason.as_str(),
            "omitted from bundle"
        );
    }
    tracing::info!(
        ingested = summary.ingested.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        rows = summary.bar_rows,
        "ingest complete"
    );
    Ok(summary)
}

/// Everything after the fetch stage, over an already-combined table.
///
/// The returned summary has no fetch-side fields filled in.
pub fn write_bundle(
    bars: &[RawBar],
    config: &BundleConfig,
    calendar: &dyn TradingCalendar,
    writer: &mut dyn BundleWriter,
) -> Result<IngestSummary, PipelineError> {
    let sessions = calendar.sessions_in_range(config.start_date, config.end_date)?;
    tracing::debug!(
        calendar = calendar.name(),
        sessions = sessions.len(),
        "session range resolved"
    );

    let assets = generate_metadata(bars, &config.exchange);
    let symbols = writer.write_assets(&assets, &exchange_rows(&config.exchange))?;

    let index = BarIndex::new(bars);
    let mut emitter = DailyBarEmitter::new(&index, &sessions, &symbols);
    let written = writer.write_daily_bars(&mut emitter)?;
    let skipped = emitter.skipped().to_vec();

    let splits = parse_splits(&split_candidates(bars, &symbols));
    let dividends = parse_dividends(&dividend_candidates(bars, &symbols));
    writer.write_adjustments(&splits, &dividends)?;
    writer.finish()?;

    let ingested = symbols
        .iter()
        .filter(|(_, symbol)| !skipped.iter().any(|k| k == symbol))
        .map(|(_, symbol)| symbol.to_string())
        .collect();

    Ok(IngestSummary {
        ingested,
        skipped,
        sessions: sessions.len(),
        bar_rows: written * sessions.len(),
        splits: splits.len(),
        dividends: dividends.len(),
        ..IngestSummary::default()
    })
}
