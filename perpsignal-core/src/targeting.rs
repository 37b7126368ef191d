//! Objective targeting — turns a profit goal or a trade horizon into
//! take-profit and stop-loss fractions.
//!
//! The objective is a PnL target on the notional (`leverage * margin`),
//! not multiplied again by leverage. A horizon without an objective
//! derives one from the ATR expected move over that horizon.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TargetingConfig;
use crate::domain::{Direction, ObjectivePlan, PositionSizing};
use crate::error::ErrorKind;
use crate::input::{candles_for_horizon, Horizon, InputError, Interval};
use crate::precision::{round_to, CURRENCY_DECIMALS, FRACTION_DECIMALS, PRICE_DECIMALS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TargetingError {
    #[error("Objective targeting requires positive leverage and position size.")]
    NonPositiveSizing,

    #[error("Objective must be a positive USDC value.")]
    NonPositiveObjective,

    #[error("Invalid entry or notional for horizon-based objective.")]
    InvalidEntry,

    #[error(transparent)]
    Input(#[from] InputError),
}

impl TargetingError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// What the trader asked for: a USDC objective or a holding horizon.
///
/// Exactly one is set by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveTarget {
    /// USDC PnL goal; the horizon defaults by objective size.
    Objective(f64),
    /// Holding horizon; the objective derives from the expected move.
    Horizon(Horizon),
}

impl ObjectiveTarget {
    /// Builds the target from optional CLI-style inputs.
    ///
    /// Both present is a conflict; neither present means no objective mode.
    pub fn from_options(
        objective_usdc: Option<f64>,
        horizon: Option<Horizon>,
    ) -> Result<Option<Self>, InputError> {
        match (objective_usdc, horizon) {
            (Some(_), Some(_)) => Err(InputError::ConflictingTargets),
            (Some(objective), None) => {
                if !(objective > 0.0) || !objective.is_finite() {
                    return Err(InputError::InvalidObjective);
                }
                Ok(Some(Self::Objective(objective)))
            }
            (None, Some(horizon)) => Ok(Some(Self::Horizon(horizon))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetingRequest {
    pub direction: Direction,
    pub entry: f64,
    pub atr: f64,
    pub base_interval: Interval,
    pub sizing: PositionSizing,
    pub target: ObjectiveTarget,
}

/// Resolved objective, levels and diagnostics. Numbers are rounded for
/// publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingResult {
    pub objective_usdc: f64,
    /// Label such as `"45m"`.
    pub horizon: String,
    pub horizon_minutes: u32,
    pub horizon_candles: u32,
    pub time_stop_rule: String,
    pub notional_usd: f64,
    pub target_tp_fraction: f64,
    pub target_tp_pct: f64,
    pub target_sl_pct: f64,
    pub risk_reward: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub expected_pnl_at_take_profit: f64,
    pub expected_pnl_at_stop_loss: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plausibility_warning: Option<String>,
}

impl From<&TargetingResult> for ObjectivePlan {
    fn from(result: &TargetingResult) -> Self {
        Self {
            objective_usdc: result.objective_usdc,
            horizon: result.horizon.clone(),
            horizon_minutes: result.horizon_minutes,
            horizon_candles: result.horizon_candles,
            time_stop_rule: result.time_stop_rule.clone(),
            target_tp_pct: result.target_tp_pct,
            target_sl_pct: result.target_sl_pct,
            risk_reward: result.risk_reward,
            notional_usd: result.notional_usd,
            plausibility_warning: result.plausibility_warning.clone(),
        }
    }
}

/// Default holding horizon in minutes for an objective size.
pub fn default_horizon_minutes(objective_usdc: f64, cfg: &TargetingConfig) -> u32 {
    if objective_usdc <= cfg.small_objective_usdc {
        cfg.small_horizon_minutes
    } else if objective_usdc >= cfg.large_objective_usdc {
        cfg.large_horizon_minutes
    } else {
        cfg.mid_horizon_minutes
    }
}

/// Target risk/reward for an objective size. Larger goals demand more reward.
pub fn default_risk_reward(objective_usdc: f64, cfg: &TargetingConfig) -> f64 {
    if objective_usdc <= cfg.small_objective_usdc {
        cfg.small_risk_reward
    } else if objective_usdc >= cfg.large_objective_usdc {
        cfg.large_risk_reward
    } else {
        cfg.mid_risk_reward
    }
}

/// Expected price move over `candles` bars: ATR scaled by sqrt(time).
fn expected_move(atr: f64, candles: u32) -> f64 {
    atr * f64::from(candles.max(1)).sqrt()
}

/// Derives a USDC objective from the ATR expected move over `horizon`.
///
/// The target fraction is a share of the expected-move fraction, clamped
/// to the configured band, then applied to the notional. Rounded to cents.
pub fn derive_objective_from_horizon(
    entry: f64,
    atr: f64,
    base_interval: Interval,
    horizon: Horizon,
    notional_usd: f64,
    cfg: &TargetingConfig,
) -> Result<f64, TargetingError> {
    if !(entry > 0.0) || !(notional_usd > 0.0) {
        return Err(TargetingError::InvalidEntry);
    }
    let candles = candles_for_horizon(horizon.minutes(), base_interval.as_minutes())?;
    let move_fraction = expected_move(atr, candles) / entry;
    let target_fraction = (move_fraction * cfg.horizon_move_share)
        .max(cfg.min_target_fraction)
        .min(cfg.max_target_fraction);
    Ok(round_to(notional_usd * target_fraction, CURRENCY_DECIMALS))
}

/// Resolves the objective, sets TP/SL from it and checks plausibility
/// against the expected move.
pub fn apply_objective_targeting(
    req: &TargetingRequest,
    cfg: &TargetingConfig,
) -> Result<TargetingResult, TargetingError> {
    let sizing = req.sizing;
    if !(sizing.leverage > 0.0) || !(sizing.position_size_usd > 0.0) {
        return Err(TargetingError::NonPositiveSizing);
    }
    let notional = sizing.notional();

    let (objective, horizon_minutes) = match req.target {
        ObjectiveTarget::Objective(objective) => {
            if !(objective > 0.0) {
                return Err(TargetingError::NonPositiveObjective);
            }
            (objective, default_horizon_minutes(objective, cfg))
        }
        ObjectiveTarget::Horizon(horizon) => {
            let derived = derive_objective_from_horizon(
                req.entry,
                req.atr,
                req.base_interval,
                horizon,
                notional,
                cfg,
            )?;
            (derived, horizon.minutes())
        }
    };

    let tp_fraction = objective / notional;
    let rr = default_risk_reward(objective, cfg);
    let sl_fraction = tp_fraction / rr;

    let sign = req.direction.sign();
    let take_profit = req.entry * (1.0 + sign * tp_fraction);
    let stop_loss = req.entry * (1.0 - sign * sl_fraction);

    let label = format!("{horizon_minutes}m");
    let horizon_candles = candles_for_horizon(horizon_minutes, req.base_interval.as_minutes())?;
    let expected = expected_move(req.atr, horizon_candles);
    let tp_distance = (take_profit - req.entry).abs();
    let plausibility_warning = (tp_distance > expected * cfg.plausibility_multiple).then(|| {
        format!(
            "TP distance is {tp_distance:.2}, above {}x expected move ({expected:.2}) for {label}. \
             Consider a longer horizon or smaller objective.",
            cfg.plausibility_multiple
        )
    });

    Ok(TargetingResult {
        objective_usdc: round_to(objective, CURRENCY_DECIMALS),
        time_stop_rule: format!(
            "If TP/SL is not hit within {label}, close at market (time-stop)."
        ),
        horizon: label,
        horizon_minutes,
        horizon_candles,
        notional_usd: round_to(notional, CURRENCY_DECIMALS),
        target_tp_fraction: round_to(tp_fraction, FRACTION_DECIMALS),
        target_tp_pct: round_to(tp_fraction * 100.0, PRICE_DECIMALS),
        target_sl_pct: round_to(sl_fraction * 100.0, PRICE_DECIMALS),
        risk_reward: round_to(rr, PRICE_DECIMALS),
        take_profit: round_to(take_profit, PRICE_DECIMALS),
        stop_loss: round_to(stop_loss, PRICE_DECIMALS),
        expected_pnl_at_take_profit: round_to(objective, PRICE_DECIMALS),
        expected_pnl_at_stop_loss: round_to(-(notional * sl_fraction), PRICE_DECIMALS),
        plausibility_warning,
    })
}
