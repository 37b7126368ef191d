//! Domain types shared by the scorer, engine, simulator and ranker.

pub mod candle;
pub mod indicators;
pub mod perp;
pub mod recommendation;
pub mod signal;

pub use candle::{sorted_by_time, Candle};
pub use indicators::IndicatorSnapshot;
pub use perp::PerpMarketSnapshot;
pub use recommendation::{ObjectivePlan, PositionSizing, Recommendation};
pub use signal::{Action, Direction, Regime, Signal};
