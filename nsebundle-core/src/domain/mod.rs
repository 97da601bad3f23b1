//! Domain types for the bundle pipeline

pub mod adjustment;
pub mod asset;
pub mod bar;
pub mod ids;

pub use adjustment::{DividendRecord, SplitRecord};
pub use asset::{AssetMetadata, ExchangeInfo};
pub use bar::{DailyBar, RawBar, SessionBars, DEFAULT_EX_DIVIDEND, DEFAULT_SPLIT_RATIO};
pub use ids::{Sid, SymbolMap};
