//! Opportunity ranking across many symbols.
//!
//! Each symbol runs through the recommendation generator independently.
//! Failures become skip entries instead of aborting the scan. Survivors
//! are ordered by estimated positive-PnL probability, then confidence,
//! then risk/reward. NO_TRADE entries are dropped before the top-N cut.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use perpsignal_core::{estimate_positive_pnl_probability, Interval, Recommendation};

use crate::ports::{GenerateRequest, RecommendationGenerator};

/// Symbols scanned when the request lists none.
pub const DEFAULT_SCAN_SYMBOLS: [&str; 15] = [
    "BTC", "ETH", "SOL", "XRP", "DOGE", "BNB", "ADA", "AVAX", "LINK", "LTC", "DOT", "SUI", "APT",
    "NEAR", "ARB",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    /// Base symbols; empty means [`DEFAULT_SCAN_SYMBOLS`].
    pub symbols: Vec<String>,
    pub interval: Interval,
    pub bias_interval: Option<Interval>,
    pub top: usize,
}

impl Default for RankRequest {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            interval: Interval::minutes(1),
            bias_interval: Some(Interval::minutes(15)),
            top: 5,
        }
    }
}

impl RankRequest {
    fn resolved_symbols(&self) -> Vec<String> {
        if self.symbols.is_empty() {
            DEFAULT_SCAN_SYMBOLS.iter().map(|s| s.to_string()).collect()
        } else {
            self.symbols.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOpportunity {
    pub symbol: String,
    pub pair: String,
    pub probability_positive_pnl: u32,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOpportunity {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankReport {
    pub scanned_symbols: usize,
    pub ranked: Vec<RankedOpportunity>,
    pub skipped: Vec<SkippedOpportunity>,
}

/// Descending probability, then confidence, then risk/reward.
fn by_rank(a: &RankedOpportunity, b: &RankedOpportunity) -> Ordering {
    b.probability_positive_pnl
        .cmp(&a.probability_positive_pnl)
        .then_with(|| b.recommendation.confidence.cmp(&a.recommendation.confidence))
        .then_with(|| {
            b.recommendation
                .risk_reward_ratio
                .partial_cmp(&a.recommendation.risk_reward_ratio)
                .unwrap_or(Ordering::Equal)
        })
}

/// Fans a symbol list out over a [`RecommendationGenerator`].
pub struct OpportunityRanker<G> {
    generator: G,
    parallel: bool,
}

impl<G: RecommendationGenerator> OpportunityRanker<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            parallel: false,
        }
    }

    /// Enables or disables parallel fan-out. Output is identical either way.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn scan_one(
        &self,
        symbol: &str,
        req: &RankRequest,
    ) -> Result<RankedOpportunity, SkippedOpportunity> {
        let pair = format!("{symbol}-USD");
        let mut gen_req = GenerateRequest::new(pair.clone(), req.interval);
        gen_req.bias_interval = req.bias_interval;
        match self.generator.generate(&gen_req) {
            Ok(recommendation) => Ok(RankedOpportunity {
                symbol: symbol.to_string(),
                pair,
                probability_positive_pnl: estimate_positive_pnl_probability(&recommendation),
                recommendation,
            }),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(%symbol, %reason, "skipping symbol");
                Err(SkippedOpportunity {
                    symbol: symbol.to_string(),
                    reason,
                })
            }
        }
    }

    pub fn rank(&self, req: &RankRequest) -> RankReport {
        let symbols = req.resolved_symbols();

        // Collected in input order, so parallel and sequential runs match.
        let outcomes: Vec<Result<RankedOpportunity, SkippedOpportunity>> = if self.parallel {
            symbols
                .par_iter()
                .map(|symbol| self.scan_one(symbol, req))
                .collect()
        } else {
            symbols.iter().map(|symbol| self.scan_one(symbol, req)).collect()
        };

        let mut ranked = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(opportunity) => ranked.push(opportunity),
                Err(skip) => skipped.push(skip),
            }
        }

        ranked.sort_by(by_rank);
        ranked.retain(|o| o.recommendation.is_actionable());
        let actionable = ranked.len();
        ranked.truncate(req.top);

        info!(
            scanned = symbols.len(),
            actionable,
            skipped = skipped.len(),
            returned = ranked.len(),
            "opportunity scan complete"
        );

        RankReport {
            scanned_symbols: symbols.len(),
            ranked,
            skipped,
        }
    }
}
