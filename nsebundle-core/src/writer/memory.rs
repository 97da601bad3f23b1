use super::{assign_sids, BundleWriter, WriterError};
use crate::domain::{
    AssetMetadata, DividendRecord, ExchangeInfo, SessionBars, Sid, SplitRecord, SymbolMap,
};
use std::collections::BTreeMap;

/// Collects everything in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub assets: Vec<AssetMetadata>,
    pub exchanges: Vec<ExchangeInfo>,
    pub symbols: Option<SymbolMap>,
    /// Bars per sid, plus the order sids arrived in.
    pub bars: BTreeMap<Sid, SessionBars>,
    pub bar_order: Vec<Sid>,
    pub splits: Vec<SplitRecord>,
    pub dividends: Vec<DividendRecord>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bars for a symbol, looked up through the assigned sids.
    pub fn bars_for(&self, symbol: &str) -> Option<&SessionBars> {
        let sid = self.symbols.as_ref()?.sid(symbol)?;
        self.bars.get(&sid)
    }
}

impl BundleWriter for MemoryWriter {
    fn write_assets(
        &mut self,
        assets: &[AssetMetadata],
        exchanges: &[ExchangeInfo],
    ) -> Result<SymbolMap, WriterError> {
        if self.symbols.is_some() {
            return Err(WriterError::AssetsAlreadyWritten);
        }
        let map = assign_sids(assets);
        self.assets = assets.to_vec();
        self.exchanges = exchanges.to_vec();
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
            self.bar_order.push(sid);
            self.bars.insert(sid, session_bars);
            written += 1;
        }
        Ok(written)
    }

    fn write_adjustments(
        &mut self,
        splits: &[SplitRecord],
        dividends: &[DividendRecord],
    ) -> Result<(), WriterError> {
        self.splits = splits.to_vec();
        self.dividends = dividends.to_vec();
        Ok(())
    }
}
