//! NSE Bundle Core: daily-bar ingestion into an asset/bar/adjustment bundle.
//!
//! This crate contains the whole batch transform:
//! - Market-data providers and the fetch stage (Yahoo chart API, CSV files)
//! - Asset metadata and exchange rows
//! - Session calendars and the forward-filling bar emitter
//! - Split and dividend adjustment tables
//! - Bundle writers (in-memory, Parquet directory)
//! - A small strategy interface over the ingested bars

pub mod adjustments;
pub mod calendar;
pub mod config;
pub mod data;
pub mod domain;
pub mod emitter;
pub mod frames;
pub mod metadata;
pub mod pipeline;
pub mod strategy;
pub mod writer;

pub use config::BundleConfig;
pub use pipeline::{ingest, IngestSummary, PipelineError};
