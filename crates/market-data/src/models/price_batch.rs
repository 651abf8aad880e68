use std::collections::HashMap;

/// Result of one bulk price fetch.
///
/// Every requested symbol has an entry; `None` means the provider had no usable
/// price for it this time.
#[derive(Clone, Debug, Default)]
pub struct PriceBatch {
    prices: HashMap<String, Option<f64>>,
}

impl PriceBatch {
    pub fn insert(&mut self, symbol: impl Into<String>, price: Option<f64>) {
        self.prices.insert(symbol.into(), price);
    }

    /// Price for `symbol`, or `None` if it was unavailable or never requested.
    pub fn price_for(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied().flatten()
    }

    /// Symbols that came back without a price, sorted.
    pub fn unavailable(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self
            .prices
            .iter()
            .filter(|(_, p)| p.is_none())
            .map(|(s, _)| s.as_str())
            .collect();
        symbols.sort_unstable();
        symbols
    }
}
