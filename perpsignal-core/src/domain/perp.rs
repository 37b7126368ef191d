//! Perpetual-futures market context.

use serde::{Deserialize, Serialize};

/// Funding and mark/index context for one perpetual market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerpMarketSnapshot {
    pub symbol: String,
    pub funding_rate: f64,
    pub funding_rate_avg: f64,
    pub open_interest: f64,
    pub mark_price: f64,
    pub index_price: f64,
    /// `(mark - index) / index * 100`.
    pub premium_pct: f64,
}

impl PerpMarketSnapshot {
    /// Builds a snapshot, deriving `premium_pct` from mark and index.
    ///
    /// A non-positive index price yields a zero premium.
    pub fn new(
        symbol: impl Into<String>,
        funding_rate: f64,
        funding_rate_avg: f64,
        open_interest: f64,
        mark_price: f64,
        index_price: f64,
    ) -> Self {
        let premium_pct = if index_price > 0.0 {
            (mark_price - index_price) / index_price * 100.0
        } else {
            0.0
        };
        Self {
            symbol: symbol.into(),
            funding_rate,
            funding_rate_avg,
            open_interest,
            mark_price,
            index_price,
            premium_pct,
        }
    }

    /// Flat context: zero funding, mark equal to index.
    pub fn neutral(symbol: impl Into<String>, price: f64) -> Self {
        Self::new(symbol, 0.0, 0.0, 0.0, price, price)
    }
}
