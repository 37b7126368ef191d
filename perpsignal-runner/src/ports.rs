//! Collaborator ports.
//!
//! Market data and indicator math live outside this workspace. These traits
//! are the seams where exchange clients and indicator libraries plug in,
//! and where tests substitute fakes.

use anyhow::Result;
use perpsignal_core::{Candle, IndicatorSnapshot, Interval, PerpMarketSnapshot, Recommendation};

/// Candle and perpetual-market data for a pair such as `"BTC-USD"`.
pub trait MarketData: Send + Sync {
    /// Up to `limit` most recent candles. Order is not guaranteed.
    fn candles(&self, pair: &str, interval: Interval, limit: usize) -> Result<Vec<Candle>>;

    fn perp_snapshot(&self, pair: &str) -> Result<PerpMarketSnapshot>;
}

/// Computes the indicator snapshot for a time-ordered candle window.
pub trait IndicatorSource: Send + Sync {
    fn compute(&self, candles: &[Candle]) -> Result<IndicatorSnapshot>;
}

impl<T: MarketData + ?Sized> MarketData for &T {
    fn candles(&self, pair: &str, interval: Interval, limit: usize) -> Result<Vec<Candle>> {
        (**self).candles(pair, interval, limit)
    }

    fn perp_snapshot(&self, pair: &str) -> Result<PerpMarketSnapshot> {
        (**self).perp_snapshot(pair)
    }
}

impl<T: IndicatorSource + ?Sized> IndicatorSource for &T {
    fn compute(&self, candles: &[Candle]) -> Result<IndicatorSnapshot> {
        (**self).compute(candles)
    }
}

/// Parameters for one generated recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub pair: String,
    pub interval: Interval,
    pub bias_interval: Option<Interval>,
    /// Candle window size; the generator's default when `None`.
    pub limit: Option<usize>,
}

impl GenerateRequest {
    pub fn new(pair: impl Into<String>, interval: Interval) -> Self {
        Self {
            pair: pair.into(),
            interval,
            bias_interval: None,
            limit: None,
        }
    }

    pub fn with_bias_interval(mut self, bias_interval: Interval) -> Self {
        self.bias_interval = Some(bias_interval);
        self
    }

    /// Base symbol of the pair (`"BTC"` for `"BTC-USD"`).
    pub fn base_symbol(&self) -> &str {
        self.pair.split('-').next().unwrap_or(&self.pair)
    }
}

/// Produces one recommendation per pair. Implemented by the live service
/// and the snapshot-backed generator; consumed by the ranker.
pub trait RecommendationGenerator: Send + Sync {
    fn generate(&self, req: &GenerateRequest) -> Result<Recommendation>;
}

impl<G: RecommendationGenerator + ?Sized> RecommendationGenerator for &G {
    fn generate(&self, req: &GenerateRequest) -> Result<Recommendation> {
        (**self).generate(req)
    }
}

impl<G: RecommendationGenerator + ?Sized> RecommendationGenerator for Box<G> {
    fn generate(&self, req: &GenerateRequest) -> Result<Recommendation> {
        (**self).generate(req)
    }
}
