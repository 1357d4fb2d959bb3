//! Resolution of trading symbols to their underlying.
//!
//! [`PrefixResolver`] reads the leading uppercase letters of the symbol, which
//! works for index and stock derivatives on NFO (`NIFTY24DEC24000CE`,
//! `RELIANCE24DECFUT`) but not for symbols with digits or separators in the
//! root. [`InstrumentMap`] uses the exchange-provided `name` column from the
//! brokerage instrument dump and only falls back to the prefix for symbols it
//! does not know.

use crate::traits::UnderlyingResolver;
use std::collections::HashMap;

/// Groups by the leading run of ASCII uppercase letters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixResolver;

impl PrefixResolver {
    /// Returns the root symbol, or the whole symbol when it does not start
    /// with an uppercase letter.
    #[must_use]
    pub fn root(symbol: &str) -> &str {
        let end = symbol
            .char_indices()
            .find(|(_, c)| !c.is_ascii_uppercase())
            .map_or(symbol.len(), |(i, _)| i);

        if end == 0 {
            symbol
        } else {
            &symbol[..end]
        }
    }
}

impl UnderlyingResolver for PrefixResolver {
    fn resolve(&self, symbol: &str) -> String {
        Self::root(symbol).to_string()
    }
}

/// Trading symbol to underlying name lookup built from instrument metadata.
#[derive(Debug, Clone, Default)]
pub struct InstrumentMap {
    names: HashMap<String, String>,
}

impl InstrumentMap {
    /// Builds the map from `(tradingsymbol, name)` pairs. Pairs with an empty
    /// name are skipped.
    pub fn from_pairs<I, S, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<String>,
    {
        let names = pairs
            .into_iter()
            .map(|(s, n)| (s.into(), n.into()))
            .filter(|(_, n)| !n.trim().is_empty())
            .collect();

        Self { names }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.names.get(symbol).map(String::as_str)
    }
}

impl UnderlyingResolver for InstrumentMap {
    fn resolve(&self, symbol: &str) -> String {
        match self.get(symbol) {
            Some(name) => name.trim().to_string(),
            None => PrefixResolver::root(symbol).to_string(),
        }
    }
}
