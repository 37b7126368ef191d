//! Candle — one OHLCV sample keyed by epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle as delivered by a market-data collaborator.
///
/// Producers do not guarantee ordering. Anything that scans candles in time
/// order must sort first (see [`sorted_by_time`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time in epoch milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if every price and volume field is finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Basic OHLC sanity: high bounds the body from above, low from below.
    pub fn is_sane(&self) -> bool {
        self.is_finite()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Open time as a UTC datetime, if the timestamp is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Copy of `candles` sorted ascending by timestamp.
///
/// The sort is stable, so candles sharing a timestamp keep input order.
pub fn sorted_by_time(candles: &[Candle]) -> Vec<Candle> {
    let mut sorted = candles.to_vec();
    sorted.sort_by_key(|c| c.timestamp);
    sorted
}
