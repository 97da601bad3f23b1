//! Parquet bundle writer.
//!
//! Layout:
//! ```text
//! {root}/assets/equities.parquet
//! {root}/assets/exchanges.parquet
//! {root}/daily_bars/sid={SID}.parquet
//! {root}/adjustments/splits.parquet
//! {root}/adjustments/dividends.parquet
//! {root}/manifest.json
//! ```
//!
//! Every file is written to `.tmp` and renamed into place. The manifest is
//! written last by `write_manifest`, so a bundle without one is incomplete.
//! `write_assets` first removes any bundle already under `root`, so a
//! reused directory never mixes tables from two runs.

use super::{assign_sids, BundleWriter, WriterError};
use crate::domain::{
    AssetMetadata, DividendRecord, ExchangeInfo, SessionBars, Sid, SplitRecord, SymbolMap,
};
use crate::frames::{
    daily_bars_frame, dividends_frame, equities_frame, exchanges_frame, splits_frame,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sidecar describing a completed bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Symbols in sid order.
    pub symbols: Vec<String>,
    pub bar_files: usize,
    pub bar_rows: usize,
    pub split_count: usize,
    pub dividend_count: usize,
    /// BLAKE3 over every emitted bar table, in emission order.
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

impl BundleManifest {
    pub fn load(root: &Path) -> Result<Self, WriterError> {
        let path = root.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        serde_json::from_str(&content).map_err(|e| WriterError::Serialization(e.to_string()))
    }
}

const MANIFEST_FILE: &str = "manifest.json";
const BUNDLE_DIRS: [&str; 3] = ["assets", "daily_bars", "adjustments"];

pub struct ParquetBundleWriter {
    root: PathBuf,
    symbols: Option<SymbolMap>,
    hasher: blake3::Hasher,
    bar_files: usize,
    bar_rows: usize,
    split_count: usize,
    dividend_count: usize,
}

impl ParquetBundleWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            symbols: None,
            hasher: blake3::Hasher::new(),
            bar_files: 0,
            bar_rows: 0,
            split_count: 0,
            dividend_count: 0,
        }
    }

    pub fn equities_path(&self) -> PathBuf {
        self.root.join("assets").join("equities.parquet")
    }

    pub fn exchanges_path(&self) -> PathBuf {
        self.root.join("assets").join("exchanges.parquet")
    }

    /// `{root}/daily_bars/sid={SID}.parquet`
    pub fn bars_path(&self, sid: Sid) -> PathBuf {
        self.root.join("daily_bars").join(format!("sid={sid}.parquet"))
    }

    pub fn splits_path(&self) -> PathBuf {
        self.root.join("adjustments").join("splits.parquet")
    }

    pub fn dividends_path(&self) -> PathBuf {
        self.root.join("adjustments").join("dividends.parquet")
    }

    /// Remove the tables and manifest of a previous run under `root`.
    ///
    /// Anything else in the directory is left alone.
    pub fn clear_previous_bundle(&self) -> Result<(), WriterError> {
        let manifest = self.root.join(MANIFEST_FILE);
        if manifest.exists() {
            fs::remove_file(&manifest).map_err(|e| io_error(&manifest, e))?;
        }
        for name in BUNDLE_DIRS {
            let dir = self.root.join(name);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
                tracing::debug!(dir = %dir.display(), "removed previous bundle tables");
            }
        }
        Ok(())
    }

    /// Write the manifest sidecar. Call after all tables are written.
    pub fn write_manifest(&mut self) -> Result<BundleManifest, WriterError> {
        let symbols = self
            .symbols
            .as_ref()
            .map(|m| m.iter().map(|(_, s)| s.to_string()).collect())
            .unwrap_or_default();

        let manifest = BundleManifest {
            symbols,
            bar_files: self.bar_files,
            bar_rows: self.bar_rows,
            split_count: self.split_count,
            dividend_count: self.dividend_count,
            data_hash: self.hasher.finalize().to_hex().to_string(),
            written_at: chrono::Local::now().naive_local(),
        };

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| WriterError::Serialization(format!("manifest: {e}")))?;
        fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;
        let path = self.root.join(MANIFEST_FILE);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| io_error(&tmp_path, e))?;
        rename_into_place(&tmp_path, &path)?;

        tracing::info!(
            root = %self.root.display(),
            sids = manifest.bar_files,
            rows = manifest.bar_rows,
            "bundle manifest written"
        );
        Ok(manifest)
    }
}

impl BundleWriter for ParquetBundleWriter {
    fn write_assets(
        &mut self,
        assets: &[AssetMetadata],
        exchanges: &[ExchangeInfo],
    ) -> Result<SymbolMap, WriterError> {
        if self.symbols.is_some() {
            return Err(WriterError::AssetsAlreadyWritten);
        }
        self.clear_previous_bundle()?;

        write_parquet(&mut equities_frame(assets)?, &self.equities_path())?;
        write_parquet(&mut exchanges_frame(exchanges)?, &self.exchanges_path())?;

        let map = assign_sids(assets);
        tracing::info!(assets = map.len(), "asset tables written");
        self.symbols = Some(map.clone());
        Ok(map)
    }

    fn write_daily_bars(
        &mut self,
        bars: &mut dyn Iterator<Item = (Sid, SessionBars)>,
    ) -> Result<usize, WriterError> {
        let known = self.symbols.as_ref().map(SymbolMap::len).unwrap_or(0);
        let mut written = 0;

        for (sid, session_bars) in bars {
            if sid.0 as usize >= known {
                return Err(WriterError::UnknownSid { sid });
            }

            let mut df = daily_bars_frame(&session_bars)?;
            write_parquet(&mut df, &self.bars_path(sid))?;

            self.hasher.update(&sid.0.to_le_bytes());
            let encoded = serde_json::to_vec(&session_bars)
                .map_err(|e| WriterError::Serialization(format!("hash serialization: {e}")))?;
            self.hasher.update(&encoded);

            self.bar_rows += session_bars.len();
            self.bar_files += 1;
            written += 1;
        }

        Ok(written)
    }

    fn write_adjustments(
        &mut self,
        splits: &[SplitRecord],
        dividends: &[DividendRecord],
    ) -> Result<(), WriterError> {
        write_parquet(&mut splits_frame(splits)?, &self.splits_path())?;
        write_parquet(&mut dividends_frame(dividends)?, &self.dividends_path())?;
        self.split_count = splits.len();
        self.dividend_count = dividends.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<(), WriterError> {
        self.write_manifest().map(|_| ())
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn io_error(path: &Path, source: std::io::Error) -> WriterError {
    WriterError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<(), WriterError> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        io_error(path, e)
    })
}

/// Atomically write a DataFrame to a Parquet file.
fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), WriterError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path).map_err(|e| io_error(&tmp_path, e))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| WriterError::Serialization(format!("write parquet {}: {e}", path.display())))?;
    rename_into_place(&tmp_path, path)
}

/// Read one bundle table back.
pub fn read_table(path: &Path) -> Result<DataFrame, WriterError> {
    let file = fs::File::open(path).map_err(|e| io_error(path, e))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| WriterError::Serialization(format!("read parquet {}: {e}", path.display())))
}
