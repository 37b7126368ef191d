//! perpsignal runner — orchestration around the core engine.
//!
//! This crate builds on `perpsignal-core` to provide:
//! - Collaborator ports for market data and indicator computation
//! - The live recommendation service (candles → indicators → bias → engine)
//! - A snapshot-directory generator for offline runs
//! - Multi-symbol opportunity ranking with optional rayon fan-out
//! - CSV candle loading for paper-trade simulation

pub mod candles;
pub mod ports;
pub mod ranker;
pub mod service;
pub mod snapshot;

pub use candles::{load_candles_csv, read_candles, CandleLoadError};
pub use ports::{GenerateRequest, IndicatorSource, MarketData, RecommendationGenerator};
pub use ranker::{
    OpportunityRanker, RankReport, RankRequest, RankedOpportunity, SkippedOpportunity,
    DEFAULT_SCAN_SYMBOLS,
};
pub use service::{RecommendationService, DEFAULT_CANDLE_LIMIT};
pub use snapshot::{MarketSnapshot, SnapshotGenerator};
