//! Recommendation — the engine's immutable output.

use serde::{Deserialize, Serialize};

use super::indicators::IndicatorSnapshot;
use super::perp::PerpMarketSnapshot;
use super::signal::{Action, Direction, Regime, Signal};
use crate::input::InputError;

/// Margin and leverage for PnL estimates and objective targeting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizing {
    pub leverage: f64,
    pub position_size_usd: f64,
}

impl PositionSizing {
    /// Validates that both leverage and margin are strictly positive.
    pub fn new(leverage: f64, position_size_usd: f64) -> Result<Self, InputError> {
        if !(leverage > 0.0) {
            return Err(InputError::NonPositive {
                field: "leverage",
                value: leverage,
            });
        }
        if !(position_size_usd > 0.0) {
            return Err(InputError::NonPositive {
                field: "position size",
                value: position_size_usd,
            });
        }
        Ok(Self {
            leverage,
            position_size_usd,
        })
    }

    /// Leverage times margin.
    pub fn notional(&self) -> f64 {
        self.leverage * self.position_size_usd
    }
}

/// Objective-mode fields carried on a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectivePlan {
    pub objective_usdc: f64,
    /// Horizon label, e.g. `"45m"`.
    pub horizon: String,
    pub horizon_minutes: u32,
    pub horizon_candles: u32,
    pub time_stop_rule: String,
    pub target_tp_pct: f64,
    pub target_sl_pct: f64,
    pub risk_reward: f64,
    pub notional_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plausibility_warning: Option<String>,
}

/// A directional recommendation with levels, risk metrics and rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub pair: String,
    pub signal: Signal,
    pub action: Action,
    pub regime: Regime,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_size_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_pnl_at_stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_pnl_at_take_profit: Option<f64>,
    pub risk_reward_ratio: f64,
    pub daily_target_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trades_to_daily_target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<ObjectivePlan>,
    pub confidence: u32,
    pub rationale: Vec<String>,
    pub indicators: IndicatorSnapshot,
    pub perp: PerpMarketSnapshot,
}

impl Recommendation {
    /// Side of the trade, or `None` when vetoed to NO_TRADE.
    pub fn direction(&self) -> Option<Direction> {
        self.signal.direction()
    }

    pub fn is_actionable(&self) -> bool {
        self.signal.is_trade()
    }
}
