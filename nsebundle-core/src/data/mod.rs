//! Market-data providers and the fetch stage

pub mod csv_import;
pub mod fetch;
pub mod provider;
pub mod yahoo;

pub use csv_import::CsvProvider;
pub use fetch::{fetch_raw_bars, normalize_frame, FetchError, FetchOutcome, NormalizedBars};
pub use provider::{
    DataError, DataProvider, DataSource, FetchProgress, NoProgress, ProviderFrame, TracingProgress,
};
pub use yahoo::YahooProvider;
