//! Recommendation engine: score, build levels, apply trade guards, and
//! assemble the immutable [`Recommendation`].

use thiserror::Error;
use tracing::debug;

use crate::config::{EngineConfig, GuardConfig};
use crate::domain::{
    Action, Direction, IndicatorSnapshot, ObjectivePlan, PerpMarketSnapshot, PositionSizing,
    Recommendation, Regime, Signal,
};
use crate::error::ErrorKind;
use crate::input::InputError;
use crate::levels::{apply_overrides, atr_levels, LevelError, LevelMode, PriceLevels};
use crate::precision::{round_to, PRICE_DECIMALS};
use crate::scoring::{score_signal, HtfBias, ScoringInput};
use crate::targeting::{apply_objective_targeting, TargetingError, TargetingRequest};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Targeting(#[from] TargetingError),

    #[error("Indicator snapshot contains non-finite values.")]
    NonFiniteIndicators,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Input(e) => e.kind(),
            EngineError::Level(e) => e.kind(),
            EngineError::Targeting(e) => e.kind(),
            EngineError::NonFiniteIndicators => ErrorKind::Validation,
        }
    }
}

/// Inputs for one `build` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub pair: String,
    pub last_price: f64,
    pub indicators: IndicatorSnapshot,
    pub perp: PerpMarketSnapshot,
    pub bias: Option<HtfBias>,
    pub sizing: Option<PositionSizing>,
    /// Overrides the configured daily target.
    pub daily_target_usd: Option<f64>,
    pub mode: LevelMode,
}

impl BuildRequest {
    pub fn new(
        pair: impl Into<String>,
        last_price: f64,
        indicators: IndicatorSnapshot,
        perp: PerpMarketSnapshot,
    ) -> Self {
        Self {
            pair: pair.into(),
            last_price,
            indicators,
            perp,
            bias: None,
            sizing: None,
            daily_target_usd: None,
            mode: LevelMode::Atr,
        }
    }

    pub fn with_bias(mut self, bias: HtfBias) -> Self {
        self.bias = Some(bias);
        self
    }

    pub fn with_sizing(mut self, sizing: PositionSizing) -> Self {
        self.sizing = Some(sizing);
        self
    }

    pub fn with_daily_target(mut self, daily_target_usd: f64) -> Self {
        self.daily_target_usd = Some(daily_target_usd);
        self
    }

    pub fn with_mode(mut self, mode: LevelMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Final-signal decision from the trade guards.
///
/// First match wins: choppy regime, then risk/reward, then confidence.
/// Returns the surviving signal and the veto note, if any.
pub fn apply_trade_guards(
    direction: Direction,
    regime: Regime,
    confidence: u32,
    risk_reward: f64,
    cfg: &GuardConfig,
) -> (Signal, Option<String>) {
    if regime == Regime::Choppy {
        return (Signal::NoTrade, Some("No-trade guard: choppy regime.".into()));
    }
    if risk_reward < cfg.min_risk_reward {
        return (
            Signal::NoTrade,
            Some(format!(
                "No-trade guard: risk/reward below {}.",
                cfg.min_risk_reward
            )),
        );
    }
    if confidence < cfg.min_confidence {
        return (
            Signal::NoTrade,
            Some("No-trade guard: confidence too low.".into()),
        );
    }
    (Signal::from(direction), None)
}

/// Stateless apart from its configuration; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds one recommendation.
    ///
    /// Errors are validation failures (bad inputs, objective mode without
    /// sizing) or invariant failures (levels on the wrong side of entry).
    pub fn build(&self, req: &BuildRequest) -> Result<Recommendation, EngineError> {
        if !(req.last_price > 0.0) || !req.last_price.is_finite() {
            return Err(InputError::NonPositive {
                field: "last price",
                value: req.last_price,
            }
            .into());
        }
        if !req.indicators.is_finite() {
            return Err(EngineError::NonFiniteIndicators);
        }
        let sizing = req
            .sizing
            .map(|s| PositionSizing::new(s.leverage, s.position_size_usd))
            .transpose()?;
        let daily_target_usd = req.daily_target_usd.unwrap_or(self.config.daily_target_usd);
        if !(daily_target_usd > 0.0) {
            return Err(InputError::NonPositive {
                field: "daily target",
                value: daily_target_usd,
            }
            .into());
        }
        req.mode.validate()?;

        let card = score_signal(
            &ScoringInput {
                indicators: &req.indicators,
                perp: &req.perp,
                last_price: req.last_price,
                bias: req.bias.as_ref(),
            },
            &self.config.scoring,
        );
        let direction = card.direction;
        let mut rationale = card.rationale;

        let (levels, objective) = self.levels_for(direction, req, sizing)?;
        // Checks and ratios run on the published (rounded) prices.
        let levels = levels.rounded();
        levels.check(direction)?;

        let risk_reward = levels.risk_reward();
        let (signal, veto) = apply_trade_guards(
            direction,
            card.regime,
            card.confidence,
            risk_reward,
            &self.config.guards,
        );
        if let Some(note) = veto {
            debug!(pair = %req.pair, %direction, reason = %note, "trade vetoed");
            rationale.push(note);
        }

        let pnl = match (signal.direction(), sizing) {
            (Some(side), Some(sizing)) => {
                let notional = sizing.notional();
                Some((
                    round_to(
                        notional * side.signed_return(levels.entry, levels.stop_loss),
                        PRICE_DECIMALS,
                    ),
                    round_to(
                        notional * side.signed_return(levels.entry, levels.take_profit),
                        PRICE_DECIMALS,
                    ),
                ))
            }
            _ => None,
        };
        let trades_to_daily_target = pnl
            .map(|(_, at_tp)| at_tp)
            .filter(|at_tp| *at_tp > 0.0)
            .map(|at_tp| (daily_target_usd / at_tp).ceil() as u32);

        Ok(Recommendation {
            pair: req.pair.clone(),
            signal,
            action: Action::from(signal),
            regime: card.regime,
            entry: levels.entry,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            leverage: sizing.map(|s| s.leverage),
            position_size_usd: sizing.map(|s| s.position_size_usd),
            estimated_pnl_at_stop_loss: pnl.map(|(at_sl, _)| at_sl),
            estimated_pnl_at_take_profit: pnl.map(|(_, at_tp)| at_tp),
            risk_reward_ratio: round_to(risk_reward, PRICE_DECIMALS),
            daily_target_usd,
            trades_to_daily_target,
            objective,
            confidence: card.confidence,
            rationale,
            indicators: req.indicators,
            perp: req.perp.clone(),
        })
    }

    fn levels_for(
        &self,
        direction: Direction,
        req: &BuildRequest,
        sizing: Option<PositionSizing>,
    ) -> Result<(PriceLevels, Option<ObjectivePlan>), EngineError> {
        let entry = req.last_price;
        match req.mode {
            LevelMode::Objective {
                target,
                base_interval,
            } => {
                let sizing = sizing.ok_or(InputError::MissingPositionSizing)?;
                let result = apply_objective_targeting(
                    &TargetingRequest {
                        direction,
                        entry,
                        atr: req.indicators.atr14,
                        base_interval,
                        sizing,
                        target,
                    },
                    &self.config.targeting,
                )?;
                let levels = PriceLevels {
                    entry,
                    stop_loss: result.stop_loss,
                    take_profit: result.take_profit,
                };
                Ok((levels, Some(ObjectivePlan::from(&result))))
            }
            mode => {
                let base = atr_levels(direction, entry, &req.indicators, &self.config.levels);
                Ok((apply_overrides(direction, base, &mode)?, None))
            }
        }
    }
}
