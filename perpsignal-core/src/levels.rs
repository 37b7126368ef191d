//! Price-level construction: ATR-adaptive defaults, manual overrides and
//! the side invariant every trade must satisfy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LevelConfig;
use crate::domain::{Direction, IndicatorSnapshot};
use crate::error::ErrorKind;
use crate::input::Interval;
use crate::precision::{round_to, PRICE_DECIMALS};
use crate::targeting::ObjectiveTarget;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("Invalid stop loss for {direction}: stop loss must be {relation} entry.")]
    StopLossSide {
        direction: Direction,
        relation: &'static str,
    },

    #[error("Invalid take profit for {direction}: take profit must be {relation} entry.")]
    TakeProfitSide {
        direction: Direction,
        relation: &'static str,
    },

    #[error("{field} override must be a positive number (got {value}).")]
    NonPositiveOverride { field: &'static str, value: f64 },
}

impl LevelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LevelError::StopLossSide { .. } | LevelError::TakeProfitSide { .. } => {
                ErrorKind::Invariant
            }
            LevelError::NonPositiveOverride { .. } => ErrorKind::Validation,
        }
    }
}

/// How stop-loss and take-profit are chosen. Exactly one mode per build.
///
/// In the override modes a `None` side keeps the ATR-adaptive level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LevelMode {
    #[default]
    Atr,
    Percent {
        #[serde(default)]
        stop_loss_pct: Option<f64>,
        #[serde(default)]
        take_profit_pct: Option<f64>,
    },
    Usd {
        #[serde(default)]
        stop_loss_usd: Option<f64>,
        #[serde(default)]
        take_profit_usd: Option<f64>,
    },
    Objective {
        target: ObjectiveTarget,
        base_interval: Interval,
    },
}

impl LevelMode {
    /// Rejects non-positive or non-finite override values.
    pub fn validate(&self) -> Result<(), LevelError> {
        let values: [(&'static str, Option<f64>); 2] = match *self {
            LevelMode::Percent {
                stop_loss_pct,
                take_profit_pct,
            } => [("stop loss %", stop_loss_pct), ("take profit %", take_profit_pct)],
            LevelMode::Usd {
                stop_loss_usd,
                take_profit_usd,
            } => [("stop loss USD", stop_loss_usd), ("take profit USD", take_profit_usd)],
            LevelMode::Atr | LevelMode::Objective { .. } => return Ok(()),
        };
        for (field, value) in values {
            if let Some(value) = value {
                if !(value > 0.0) || !value.is_finite() {
                    return Err(LevelError::NonPositiveOverride { field, value });
                }
            }
        }
        Ok(())
    }
}

/// Entry, stop-loss and take-profit prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl PriceLevels {
    /// Reward over risk; 0 when the stop sits on the entry.
    pub fn risk_reward(&self) -> f64 {
        let risk = (self.entry - self.stop_loss).abs();
        let reward = (self.take_profit - self.entry).abs();
        if risk <= 0.0 {
            return 0.0;
        }
        reward / risk
    }

    pub fn rounded(&self) -> Self {
        Self {
            entry: round_to(self.entry, PRICE_DECIMALS),
            stop_loss: round_to(self.stop_loss, PRICE_DECIMALS),
            take_profit: round_to(self.take_profit, PRICE_DECIMALS),
        }
    }

    /// LONG: `stop_loss < entry < take_profit`. SHORT: mirrored.
    pub fn check(&self, direction: Direction) -> Result<(), LevelError> {
        let (stop_ok, take_ok, stop_rel, take_rel) = match direction {
            Direction::Long => (
                self.stop_loss < self.entry,
                self.take_profit > self.entry,
                "below",
                "above",
            ),
            Direction::Short => (
                self.stop_loss > self.entry,
                self.take_profit < self.entry,
                "above",
                "below",
            ),
        };
        if !stop_ok {
            return Err(LevelError::StopLossSide {
                direction,
                relation: stop_rel,
            });
        }
        if !take_ok {
            return Err(LevelError::TakeProfitSide {
                direction,
                relation: take_rel,
            });
        }
        Ok(())
    }
}

/// ATR-adaptive levels anchored to the Bollinger bands.
///
/// The stop is the farther of `k_sl * ATR` and the middle band; the target
/// is the farther of `k_tp * ATR` and the outer band. If the band pulls the
/// target to the wrong side of entry, the fallback multiple is used.
pub fn atr_levels(
    direction: Direction,
    entry: f64,
    indicators: &IndicatorSnapshot,
    cfg: &LevelConfig,
) -> PriceLevels {
    let profile = cfg.profile_for(indicators.atr_pct());
    let atr = indicators.atr14;
    let (stop_loss, take_profit) = match direction {
        Direction::Long => {
            let stop = (entry - profile.sl_mult * atr).min(indicators.bb_middle);
            let mut take = (entry + profile.tp_mult * atr).max(indicators.bb_upper);
            if take <= entry {
                take = entry + profile.tp_fallback_mult * atr;
            }
            (stop, take)
        }
        Direction::Short => {
            let stop = (entry + profile.sl_mult * atr).max(indicators.bb_middle);
            let mut take = (entry - profile.tp_mult * atr).min(indicators.bb_lower);
            if take >= entry {
                take = entry - profile.tp_fallback_mult * atr;
            }
            (stop, take)
        }
    };
    PriceLevels {
        entry,
        stop_loss,
        take_profit,
    }
}

/// Applies percent or USD overrides on top of `base`.
///
/// `Atr` and `Objective` modes return `base` unchanged; objective levels
/// come from targeting instead.
pub fn apply_overrides(
    direction: Direction,
    base: PriceLevels,
    mode: &LevelMode,
) -> Result<PriceLevels, LevelError> {
    mode.validate()?;
    let entry = base.entry;
    let sign = direction.sign();
    let (stop_move, take_move) = match *mode {
        LevelMode::Percent {
            stop_loss_pct,
            take_profit_pct,
        } => (
            stop_loss_pct.map(|pct| entry * pct / 100.0),
            take_profit_pct.map(|pct| entry * pct / 100.0),
        ),
        LevelMode::Usd {
            stop_loss_usd,
            take_profit_usd,
        } => (stop_loss_usd, take_profit_usd),
        LevelMode::Atr | LevelMode::Objective { .. } => return Ok(base),
    };
    Ok(PriceLevels {
        entry,
        stop_loss: stop_move.map_or(base.stop_loss, |m| entry - sign * m),
        take_profit: take_move.map_or(base.take_profit, |m| entry + sign * m),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicators::sample_indicators;

    #[test]
    fn long_levels_use_band_anchors() {
        // atr% = 150 / 50500 ≈ 0.297 → normal profile
        let ind = sample_indicators();
        let lv = atr_levels(Direction::Long, 50_000.0, &ind, &LevelConfig::default());
        assert_eq!(lv.stop_loss, 49_820.0);
        assert_eq!(lv.take_profit, 51_000.0);
        assert!(lv.check(Direction::Long).is_ok());
    }

    #[test]
    fn short_levels_use_band_anchors() {
        let ind = sample_indicators();
        let lv = atr_levels(Direction::Short, 50_000.0, &ind, &LevelConfig::default());
        assert_eq!(lv.stop_loss, 50_180.0);
        assert_eq!(lv.take_profit, 49_000.0);
        assert!(lv.check(Direction::Short).is_ok());
    }

    #[test]
    fn fallback_take_profit_when_band_is_behind_entry() {
        let mut ind = sample_indicators();
        ind.atr14 = 0.0;
        ind.bb_middle = 49_000.0;
        ind.bb_upper = 49_900.0;
        let lv = atr_levels(Direction::Long, 50_000.0, &ind, &LevelConfig::default());
        // low-volatility profile, zero ATR: fallback lands on entry
        assert_eq!(lv.take_profit, 50_000.0);
        assert!(matches!(
            lv.check(Direction::Long),
            Err(LevelError::TakeProfitSide { .. })
        ));
    }

    #[test]
    fn volatility_band_selects_profile() {
        let cfg = LevelConfig::default();
        let mut ind = sample_indicators();
        ind.bb_middle = 60_000.0;
        ind.bb_upper = 0.0;

        ind.atr14 = 50.0; // 0.099% → low
        let lv = atr_levels(Direction::Long, 50_000.0, &ind, &cfg);
        assert_eq!(lv.stop_loss, 49_950.0);
        assert_eq!(lv.take_profit, 50_075.0);

        ind.atr14 = 650.0; // 1.29% → high
        let lv = atr_levels(Direction::Long, 50_000.0, &ind, &cfg);
        assert_eq!(lv.stop_loss, 50_000.0 - 1.45 * 650.0);
        assert_eq!(lv.take_profit, 50_000.0 + 2.4 * 650.0);
    }

    #[test]
    fn percent_override_long() {
        let base = atr_levels(
            Direction::Long,
            50_000.0,
            &sample_indicators(),
            &LevelConfig::default(),
        );
        let mode = LevelMode::Percent {
            stop_loss_pct: Some(1.0),
            take_profit_pct: Some(2.0),
        };
        let lv = apply_overrides(Direction::Long, base, &mode).unwrap().rounded();
        assert_eq!(lv.stop_loss, 49_500.0);
        assert_eq!(lv.take_profit, 51_000.0);
    }

    #[test]
    fn usd_override_short_keeps_missing_side() {
        let base = atr_levels(
            Direction::Short,
            50_000.0,
            &sample_indicators(),
            &LevelConfig::default(),
        );
        let mode = LevelMode::Usd {
            stop_loss_usd: Some(250.0),
            take_profit_usd: None,
        };
        let lv = apply_overrides(Direction::Short, base, &mode).unwrap();
        assert_eq!(lv.stop_loss, 50_250.0);
        assert_eq!(lv.take_profit, base.take_profit);
    }

    #[test]
    fn override_must_be_positive() {
        let mode = LevelMode::Percent {
            stop_loss_pct: Some(0.0),
            take_profit_pct: None,
        };
        let err = mode.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().starts_with("stop loss %"));
    }

    #[test]
    fn invariant_messages() {
        let lv = PriceLevels {
            entry: 100.0,
            stop_loss: 101.0,
            take_profit: 102.0,
        };
        let err = lv.check(Direction::Long).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert_eq!(
            err.to_string(),
            "Invalid stop loss for LONG: stop loss must be below entry."
        );
        let err = lv.check(Direction::Short).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid take profit for SHORT: take profit must be below entry."
        );
    }

    #[test]
    fn risk_reward_zero_when_no_risk() {
        let lv = PriceLevels {
            entry: 100.0,
            stop_loss: 100.0,
            take_profit: 102.0,
        };
        assert_eq!(lv.risk_reward(), 0.0);
    }

    #[test]
    fn mode_serde_is_tagged() {
        let mode: LevelMode =
            serde_json::from_str(r#"{"mode":"percent","stop_loss_pct":1.5}"#).unwrap();
        assert_eq!(
            mode,
            LevelMode::Percent {
                stop_loss_pct: Some(1.5),
                take_profit_pct: None
            }
        );
    }
}
