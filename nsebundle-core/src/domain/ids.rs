use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dense integer asset identifier assigned by the asset writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sid(pub u32);

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Sid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Bidirectional sid <-> symbol association.
///
/// Iteration follows sid order, which is the order symbols were registered in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMap {
    by_sid: Vec<String>,
    by_symbol: HashMap<String, Sid>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign sids 0..n in iteration order. Repeated symbols keep their first sid.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for symbol in symbols {
            map.insert(symbol);
        }
        map
    }

    /// Register a symbol, returning its sid (existing or newly assigned).
    pub fn insert(&mut self, symbol: impl Into<String>) -> Sid {
        let symbol = symbol.into();
        if let Some(sid) = self.by_symbol.get(&symbol) {
            return *sid;
        }
        let sid = Sid(self.by_sid.len() as u32);
        self.by_symbol.insert(symbol.clone(), sid);
        self.by_sid.push(symbol);
        sid
    }

    pub fn sid(&self, symbol: &str) -> Option<Sid> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn symbol(&self, sid: Sid) -> Option<&str> {
        self.by_sid.get(sid.0 as usize).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sid, &str)> + '_ {
        self.by_sid
            .iter()
            .enumerate()
            .map(|(i, s)| (Sid(i as u32), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_sid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sid.is_empty()
    }
}
