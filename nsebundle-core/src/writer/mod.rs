//! Bundle writers: the sinks the pipeline feeds.
//!
//! A writer owns the final form of the data. The asset writer assigns sids;
//! everything written afterwards is keyed by those sids.

pub mod memory;
pub mod parquet;

pub use memory::MemoryWriter;
pub use parquet::{BundleManifest, ParquetBundleWriter};

use crate::domain::{
    AssetMetadata, DividendRecord, ExchangeInfo, SessionBars, Sid, SplitRecord, SymbolMap,
};
use crate::frames::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("table error: {0}")]
    Table(#[from] SchemaError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("daily bars for sid {sid} written before assets")]
    UnknownSid { sid: Sid },

    #[error("assets already written for this bundle")]
    AssetsAlreadyWritten,
}

pub trait BundleWriter {
    /// Write equities and exchanges; sids are assigned densely in `assets` order.
    fn write_assets(
        &mut self,
        assets: &[AssetMetadata],
        exchanges: &[ExchangeInfo],
    ) -> Result<SymbolMap, WriterError>;

    /// Consume the lazy bar sequence once. Returns the number of sids written.
    fn write_daily_bars(
        &mut self,
        bars: &mut dyn Iterator<Item = (Sid, SessionBars)>,
    ) -> Result<usize, WriterError>;

    fn write_adjustments(
        &mut self,
        splits: &[SplitRecord],
        dividends: &[DividendRecord],
    ) -> Result<(), WriterError>;

    /// Called once after every table is written.
    fn finish(&mut self) -> Result<(), WriterError> {
        Ok(())
    }
}

/// Sid assignment shared by all writers.
pub(crate) fn assign_sids(assets: &[AssetMetadata]) -> SymbolMap {
    SymbolMap::from_symbols(assets.iter().map(|a| a.symbol.as_str()))
}
