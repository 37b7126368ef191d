//! Live recommendation service: fetch candles, compute indicators, derive
//! the higher-timeframe bias, build through the engine.

use anyhow::{bail, Context, Result};
use tracing::debug;

use perpsignal_core::domain::sorted_by_time;
use perpsignal_core::{BuildRequest, Direction, HtfBias, RecommendationEngine};

use crate::ports::{GenerateRequest, IndicatorSource, MarketData, RecommendationGenerator};

/// Candle window used when a request does not set one.
pub const DEFAULT_CANDLE_LIMIT: usize = 120;

pub struct RecommendationService<M, I> {
    market: M,
    indicators: I,
    engine: RecommendationEngine,
}

impl<M: MarketData, I: IndicatorSource> RecommendationService<M, I> {
    pub fn new(market: M, indicators: I, engine: RecommendationEngine) -> Self {
        Self {
            market,
            indicators,
            engine,
        }
    }

    fn bias_for(&self, req: &GenerateRequest, limit: usize) -> Result<Option<HtfBias>> {
        let Some(bias_interval) = req.bias_interval else {
            return Ok(None);
        };
        let candles = sorted_by_time(&self.market.candles(&req.pair, bias_interval, limit)?);
        if candles.is_empty() {
            bail!("No bias candle data returned for {} ({bias_interval}).", req.pair);
        }
        let snapshot = self.indicators.compute(&candles)?;
        let direction = if snapshot.trend_is_up() {
            Direction::Long
        } else {
            Direction::Short
        };
        Ok(Some(HtfBias::new(direction, bias_interval.to_string())))
    }
}

impl<M: MarketData, I: IndicatorSource> RecommendationGenerator for RecommendationService<M, I> {
    fn generate(&self, req: &GenerateRequest) -> Result<perpsignal_core::Recommendation> {
        let limit = req.limit.unwrap_or(DEFAULT_CANDLE_LIMIT);
        let candles = sorted_by_time(&self.market.candles(&req.pair, req.interval, limit)?);
        let Some(last) = candles.last() else {
            bail!("No candle data returned from market source.");
        };
        let last_price = last.close;

        let indicators = self
            .indicators
            .compute(&candles)
            .with_context(|| format!("computing indicators for {}", req.pair))?;
        let bias = self.bias_for(req, limit)?;
        let perp = self.market.perp_snapshot(&req.pair)?;

        debug!(pair = %req.pair, ?indicators, "indicator snapshot");
        debug!(pair = %req.pair, ?perp, "perp snapshot");

        let mut build = BuildRequest::new(req.pair.clone(), last_price, indicators, perp);
        if let Some(bias) = bias {
            build = build.with_bias(bias);
        }
        Ok(self.engine.build(&build)?)
    }
}
