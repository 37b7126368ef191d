//! Indicator snapshot consumed by the scorer and level constructor.

use serde::{Deserialize, Serialize};

/// Latest value of each indicator for one candle window.
///
/// Computed upstream; the core takes the values as given. `bb_lower <=
/// bb_middle <= bb_upper` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi14: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub atr14: f64,
    pub adx14: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub stoch_rsi_k: f64,
    pub stoch_rsi_d: f64,
    pub vwap: f64,
}

impl IndicatorSnapshot {
    /// ATR as a percentage of EMA20, with EMA20 floored at 1.
    pub fn atr_pct(&self) -> f64 {
        self.atr14 / self.ema20.max(1.0) * 100.0
    }

    /// True when the short EMA is at or above the long EMA.
    pub fn trend_is_up(&self) -> bool {
        self.ema20 >= self.ema50
    }

    /// Returns true if every field is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.rsi14,
            self.ema20,
            self.ema50,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.atr14,
            self.adx14,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.stoch_rsi_k,
            self.stoch_rsi_d,
            self.vwap,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[cfg(test)]
pub(crate) fn sample_indicators() -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi14: 58.0,
        ema20: 50_500.0,
        ema50: 50_000.0,
        macd: 20.0,
        macd_signal: 10.0,
        macd_histogram: 5.0,
        atr14: 150.0,
        adx14: 30.0,
        bb_upper: 51_000.0,
        bb_middle: 50_000.0,
        bb_lower: 49_000.0,
        stoch_rsi_k: 60.0,
        stoch_rsi_d: 50.0,
        vwap: 50_200.0,
    }
}
