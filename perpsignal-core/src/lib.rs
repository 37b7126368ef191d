//! perpsignal core — signal scoring, price levels, objective targeting,
//! trade guards and paper-trade evaluation for perpetual futures.
//!
//! This crate is pure and synchronous:
//! - Domain types (candles, indicator and perp snapshots, recommendations)
//! - Weighted multi-factor scorer with regime classification
//! - ATR-adaptive, manual-override and objective-derived price levels
//! - Trade guards that veto weak setups into NO_TRADE
//! - First-touch paper-trade simulation
//! - Positive-PnL probability heuristic for ranking
//! - Input parsing and TOML-backed configuration

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod input;
pub mod levels;
pub mod precision;
pub mod probability;
pub mod scoring;
pub mod simulation;
pub mod targeting;

pub use config::{ConfigError, EngineConfig};
pub use domain::{
    Action, Candle, Direction, IndicatorSnapshot, ObjectivePlan, PerpMarketSnapshot,
    PositionSizing, Recommendation, Regime, Signal,
};
pub use engine::{apply_trade_guards, BuildRequest, EngineError, RecommendationEngine};
pub use error::ErrorKind;
pub use input::{
    parse_trading_input, parse_trading_symbol, Horizon, InputError, Interval, TradingInput,
};
pub use levels::{LevelError, LevelMode, PriceLevels};
pub use probability::estimate_positive_pnl_probability;
pub use scoring::{score_signal, HtfBias, ScoreCard, ScoringInput};
pub use simulation::{
    evaluate_paper_trade, ExitKind, OutcomeStatus, PaperTrade, SimulationError, SimulationOutcome,
};
pub use targeting::{
    apply_objective_targeting, ObjectiveTarget, TargetingError, TargetingRequest, TargetingResult,
};
