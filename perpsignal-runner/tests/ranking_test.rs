//! BDD tests for opportunity ranking.
//!
//! These tests verify:
//! - Probability ordering with confidence and risk/reward tie-breaks
//! - NO_TRADE exclusion and top-N truncation
//! - Per-symbol failures recorded as skips
//! - Parallel and sequential scans agree
//! - Ordering and top-N bounds hold for arbitrary inputs

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use perpsignal_core::{
    Action, IndicatorSnapshot, Interval, PerpMarketSnapshot, Recommendation, Regime, Signal,
};
use perpsignal_runner::{
    GenerateRequest, OpportunityRanker, RankRequest, RecommendationGenerator,
    DEFAULT_SCAN_SYMBOLS,
};

fn indicators() -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi14: 55.0,
        ema20: 101.0,
        ema50: 100.0,
        macd: 1.0,
        macd_signal: 0.5,
        macd_histogram: 0.5,
        atr14: 0.5,
        adx14: 25.0,
        bb_upper: 102.0,
        bb_middle: 100.0,
        bb_lower: 98.0,
        stoch_rsi_k: 50.0,
        stoch_rsi_d: 40.0,
        vwap: 100.0,
    }
}

fn rec(pair: &str, signal: Signal, regime: Regime, confidence: u32, rr: f64) -> Recommendation {
    Recommendation {
        pair: pair.into(),
        signal,
        action: Action::from(signal),
        regime,
        entry: 100.0,
        stop_loss: 99.0,
        take_profit: 102.0,
        leverage: None,
        position_size_usd: None,
        estimated_pnl_at_stop_loss: None,
        estimated_pnl_at_take_profit: None,
        risk_reward_ratio: rr,
        daily_target_usd: 100.0,
        trades_to_daily_target: None,
        objective: None,
        confidence,
        rationale: Vec::new(),
        indicators: indicators(),
        perp: PerpMarketSnapshot::neutral("X_USDC_PERP", 100.0),
    }
}

/// Serves canned recommendations by pair; unknown pairs fail.
#[derive(Default)]
struct CannedGenerator {
    by_pair: HashMap<String, std::result::Result<Recommendation, String>>,
}

impl CannedGenerator {
    fn ok(mut self, symbol: &str, signal: Signal, regime: Regime, confidence: u32, rr: f64) -> Self {
        let pair = format!("{symbol}-USD");
        self.by_pair
            .insert(pair.clone(), Ok(rec(&pair, signal, regime, confidence, rr)));
        self
    }

    fn err(mut self, symbol: &str, reason: &str) -> Self {
        self.by_pair
            .insert(format!("{symbol}-USD"), Err(reason.to_string()));
        self
    }
}

impl RecommendationGenerator for CannedGenerator {
    fn generate(&self, req: &GenerateRequest) -> Result<Recommendation> {
        match self.by_pair.get(&req.pair) {
            Some(Ok(rec)) => Ok(rec.clone()),
            Some(Err(reason)) => Err(anyhow!(reason.clone())),
            None => Err(anyhow!("no market for {}", req.pair)),
        }
    }
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn market() -> CannedGenerator {
    CannedGenerator::default()
        .ok("BTC", Signal::Long, Regime::Tradeable, 80, 2.0)
        .ok("ETH", Signal::Long, Regime::Tradeable, 80, 1.5)
        .ok("SOL", Signal::NoTrade, Regime::Choppy, 70, 2.0)
        .err("DOGE", "No candle data returned from market source.")
        .ok("XRP", Signal::Short, Regime::Tradeable, 70, 2.5)
        .ok("ADA", Signal::Short, Regime::Tradeable, 80, 1.5)
}

#[test]
fn bdd_scenario_rank_mixed_market() {
    // GIVEN six symbols: four tradeable, one NO_TRADE, one failing
    let ranker = OpportunityRanker::new(market());
    let req = RankRequest {
        symbols: symbols(&["BTC", "ETH", "SOL", "DOGE", "XRP", "ADA"]),
        top: 10,
        ..RankRequest::default()
    };

    // WHEN ranked
    let report = ranker.rank(&req);

    // THEN tradeable symbols come back by probability, ties in scan order
    let order: Vec<&str> = report.ranked.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(order, ["BTC", "ETH", "ADA", "XRP"]);
    assert_eq!(report.ranked[0].probability_positive_pnl, 96);
    assert_eq!(report.ranked[0].pair, "BTC-USD");

    // AND the failure is a skip with the generator's message
    assert_eq!(report.scanned_symbols, 6);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].symbol, "DOGE");
    assert_eq!(
        report.skipped[0].reason,
        "No candle data returned from market source."
    );
}

#[test]
fn bdd_scenario_top_n_applies_after_no_trade_filter() {
    // GIVEN a NO_TRADE symbol with the highest raw confidence
    let generator = CannedGenerator::default()
        .ok("SOL", Signal::NoTrade, Regime::Tradeable, 100, 3.0)
        .ok("BTC", Signal::Long, Regime::Tradeable, 60, 2.0)
        .ok("ETH", Signal::Long, Regime::Tradeable, 50, 2.0);

    // WHEN asking for the top 1
    let report = OpportunityRanker::new(generator).rank(&RankRequest {
        symbols: symbols(&["SOL", "BTC", "ETH"]),
        top: 1,
        ..RankRequest::default()
    });

    // THEN the best tradeable symbol fills the slot
    assert_eq!(report.ranked.len(), 1);
    assert_eq!(report.ranked[0].symbol, "BTC");
}

#[test]
fn confidence_then_risk_reward_break_ties() {
    // 82 + 7 + 5 = 94 and 78 + 7 + 9 = 94: confidence decides
    let generator = CannedGenerator::default()
        .ok("LOW", Signal::Long, Regime::Tradeable, 78, 2.0)
        .ok("HIGH", Signal::Long, Regime::Tradeable, 82, 1.5)
        // same probability and confidence: larger risk/reward first
        .ok("RR2", Signal::Short, Regime::Tradeable, 70, 2.0)
        .ok("RR3", Signal::Short, Regime::Tradeable, 70, 3.0);
    let report = OpportunityRanker::new(generator).rank(&RankRequest {
        symbols: symbols(&["LOW", "HIGH", "RR2", "RR3"]),
        top: 10,
        ..RankRequest::default()
    });
    let order: Vec<&str> = report.ranked.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(order, ["HIGH", "LOW", "RR3", "RR2"]);
}

#[test]
fn empty_symbol_list_scans_defaults() {
    let report = OpportunityRanker::new(CannedGenerator::default()).rank(&RankRequest::default());
    assert_eq!(report.scanned_symbols, DEFAULT_SCAN_SYMBOLS.len());
    assert_eq!(report.skipped.len(), 15);
    assert_eq!(report.skipped[0].symbol, "BTC");
    assert!(report.ranked.is_empty());
}

#[test]
fn parallel_matches_sequential() {
    let req = RankRequest {
        symbols: symbols(&["BTC", "ETH", "SOL", "DOGE", "XRP", "ADA"]),
        interval: Interval::minutes(5),
        top: 5,
        ..RankRequest::default()
    };
    let sequential = OpportunityRanker::new(market()).rank(&req);
    let parallel = OpportunityRanker::new(market())
        .with_parallelism(true)
        .rank(&req);
    assert_eq!(sequential, parallel);
}

#[test]
fn report_serializes() {
    let report = OpportunityRanker::new(market()).rank(&RankRequest {
        symbols: symbols(&["BTC", "DOGE"]),
        ..RankRequest::default()
    });
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["scanned_symbols"], 2);
    assert_eq!(json["ranked"][0]["recommendation"]["signal"], "LONG");
    assert_eq!(json["skipped"][0]["symbol"], "DOGE");
}

// ── Properties ───────────────────────────────────────────────────────

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ranked_output_is_ordered_and_bounded(
            entries in prop::collection::vec((0u32..=100, 0.5f64..4.0, any::<bool>()), 0..12),
            top in 0usize..8,
        ) {
            let mut generator = CannedGenerator::default();
            let mut names = Vec::new();
            for (i, (confidence, rr, tradeable)) in entries.iter().enumerate() {
                let name = format!("S{i}");
                let signal = if *tradeable { Signal::Long } else { Signal::NoTrade };
                generator = generator.ok(&name, signal, Regime::Tradeable, *confidence, *rr);
                names.push(name);
            }

            let report = OpportunityRanker::new(generator).rank(&RankRequest {
                symbols: names.clone(),
                top,
                ..RankRequest::default()
            });

            prop_assert_eq!(report.scanned_symbols, names.len());
            prop_assert!(report.ranked.len() <= top);
            prop_assert!(report.skipped.is_empty());
            for opp in &report.ranked {
                prop_assert!(opp.recommendation.is_actionable());
            }
            for pair in report.ranked.windows(2) {
                prop_assert!(pair[0].probability_positive_pnl >= pair[1].probability_positive_pnl);
            }
        }
    }
}
