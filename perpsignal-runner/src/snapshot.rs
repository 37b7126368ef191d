//! File-backed recommendation generator.
//!
//! Reads one JSON [`MarketSnapshot`] per symbol from a directory
//! (`<dir>/<SYMBOL>.json`) and builds through the same engine path as the
//! live service.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use perpsignal_core::{
    BuildRequest, HtfBias, IndicatorSnapshot, PerpMarketSnapshot, Recommendation,
    RecommendationEngine,
};

use crate::ports::{GenerateRequest, RecommendationGenerator};

/// Everything the engine needs for one pair, captured at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub last_price: f64,
    pub indicators: IndicatorSnapshot,
    pub perp: PerpMarketSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<HtfBias>,
}

impl MarketSnapshot {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing snapshot {}", path.display()))
    }

    /// Engine request for `pair` with this snapshot's data and bias.
    pub fn build_request(&self, pair: impl Into<String>) -> BuildRequest {
        let req = BuildRequest::new(pair, self.last_price, self.indicators, self.perp.clone());
        match &self.bias {
            Some(bias) => req.with_bias(bias.clone()),
            None => req,
        }
    }
}

pub struct SnapshotGenerator {
    dir: PathBuf,
    engine: RecommendationEngine,
}

impl SnapshotGenerator {
    pub fn new(dir: impl Into<PathBuf>, engine: RecommendationEngine) -> Self {
        Self {
            dir: dir.into(),
            engine,
        }
    }

    pub fn snapshot_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }
}

impl RecommendationGenerator for SnapshotGenerator {
    fn generate(&self, req: &GenerateRequest) -> Result<Recommendation> {
        let mut snapshot = MarketSnapshot::from_file(&self.snapshot_path(req.base_symbol()))?;
        // An unlabelled bias takes the requested bias timeframe's name.
        if let (Some(bias), Some(interval)) = (snapshot.bias.as_mut(), req.bias_interval) {
            if bias.label.is_none() {
                bias.label = Some(interval.to_string());
            }
        }
        Ok(self.engine.build(&snapshot.build_request(req.pair.clone()))?)
    }
}
