//! Engine configuration: every weight, band edge and threshold in one place.
//!
//! Defaults reproduce the stock scoring model. A TOML file may override any
//! subset of fields; missing fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

/// Upper bound for any single weight or confidence base.
pub const MAX_SCORE_POINTS: u32 = 1_000;

/// Points awarded by each scoring factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub ema_trend: u32,
    pub adx_strength: u32,
    pub macd_momentum: u32,
    pub rsi_continuation: u32,
    pub rsi_reversal: u32,
    pub stoch_rsi_timing: u32,
    pub vwap_side: u32,
    pub bollinger_stretch: u32,
    pub funding_crowding: u32,
    pub premium_crowding: u32,
    pub htf_bias: u32,
    pub stable_volatility: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            ema_trend: 28,
            adx_strength: 10,
            macd_momentum: 18,
            rsi_continuation: 4,
            rsi_reversal: 5,
            stoch_rsi_timing: 3,
            vwap_side: 10,
            bollinger_stretch: 3,
            funding_crowding: 4,
            premium_crowding: 4,
            htf_bias: 16,
            stable_volatility: 3,
        }
    }
}

/// Band edges the scoring factors compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    pub adx_strong: f64,
    pub adx_choppy: f64,
    /// Long continuation band is `(rsi_bull_floor, rsi_overbought)`.
    pub rsi_bull_floor: f64,
    /// Short continuation band is `(rsi_oversold, rsi_bear_ceiling)`.
    pub rsi_bear_ceiling: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub stoch_rsi_upper: f64,
    pub stoch_rsi_lower: f64,
    pub funding_rate: f64,
    pub premium_pct: f64,
    pub atr_pct_choppy: f64,
    pub atr_pct_elevated: f64,
    pub vwap_proximity_pct: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            adx_strong: 25.0,
            adx_choppy: 18.0,
            rsi_bull_floor: 55.0,
            rsi_bear_ceiling: 45.0,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            stoch_rsi_upper: 80.0,
            stoch_rsi_lower: 20.0,
            funding_rate: 0.00005,
            premium_pct: 0.15,
            atr_pct_choppy: 0.12,
            atr_pct_elevated: 0.8,
            vwap_proximity_pct: 0.03,
        }
    }
}

/// Mapping from score difference to confidence, plus regime penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub strong_diff: u32,
    pub strong_base: u32,
    pub weak_base: u32,
    pub weak_floor: u32,
    pub ceiling: u32,
    pub floor: u32,
    pub choppy_penalty: u32,
    pub vwap_penalty: u32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            strong_diff: 15,
            strong_base: 50,
            weak_base: 45,
            weak_floor: 35,
            ceiling: 100,
            floor: 25,
            choppy_penalty: 18,
            vwap_penalty: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub thresholds: ScoringThresholds,
    pub confidence: ConfidenceConfig,
}

/// ATR multipliers for stop, take-profit and the take-profit fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrProfile {
    pub sl_mult: f64,
    pub tp_mult: f64,
    pub tp_fallback_mult: f64,
}

/// ATR-adaptive level profiles selected by ATR% band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// ATR% strictly below this selects `low_volatility`.
    pub low_volatility_below_pct: f64,
    /// ATR% strictly above this selects `high_volatility`.
    pub high_volatility_above_pct: f64,
    pub low_volatility: AtrProfile,
    pub normal: AtrProfile,
    pub high_volatility: AtrProfile,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            low_volatility_below_pct: 0.18,
            high_volatility_above_pct: 1.0,
            low_volatility: AtrProfile {
                sl_mult: 1.0,
                tp_mult: 1.5,
                tp_fallback_mult: 1.35,
            },
            normal: AtrProfile {
                sl_mult: 1.2,
                tp_mult: 2.0,
                tp_fallback_mult: 1.8,
            },
            high_volatility: AtrProfile {
                sl_mult: 1.45,
                tp_mult: 2.4,
                tp_fallback_mult: 2.2,
            },
        }
    }
}

impl LevelConfig {
    /// Profile for the given ATR% band.
    pub fn profile_for(&self, atr_pct: f64) -> AtrProfile {
        if atr_pct < self.low_volatility_below_pct {
            self.low_volatility
        } else if atr_pct > self.high_volatility_above_pct {
            self.high_volatility
        } else {
            self.normal
        }
    }
}

/// Trade-guard thresholds applied after level construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub min_risk_reward: f64,
    pub min_confidence: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_risk_reward: 1.2,
            min_confidence: 45,
        }
    }
}

/// Objective/horizon targeting constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Warn when the TP distance exceeds this multiple of the expected move.
    pub plausibility_multiple: f64,
    /// Share of the expected move used when deriving an objective from a horizon.
    pub horizon_move_share: f64,
    pub min_target_fraction: f64,
    pub max_target_fraction: f64,
    /// Objectives at or below this are "small".
    pub small_objective_usdc: f64,
    /// Objectives at or above this are "large".
    pub large_objective_usdc: f64,
    pub small_risk_reward: f64,
    pub mid_risk_reward: f64,
    pub large_risk_reward: f64,
    pub small_horizon_minutes: u32,
    pub mid_horizon_minutes: u32,
    pub large_horizon_minutes: u32,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            plausibility_multiple: 1.5,
            horizon_move_share: 0.8,
            min_target_fraction: 0.001,
            max_target_fraction: 0.02,
            small_objective_usdc: 10.0,
            large_objective_usdc: 30.0,
            small_risk_reward: 1.4,
            mid_risk_reward: 1.8,
            large_risk_reward: 2.1,
            small_horizon_minutes: 15,
            mid_horizon_minutes: 45,
            large_horizon_minutes: 75,
        }
    }
}

/// Top-level configuration for scoring, levels, guards and targeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub levels: LevelConfig,
    pub guards: GuardConfig,
    pub targeting: TargetingConfig,
    /// Daily PnL goal used for `trades_to_daily_target`.
    pub daily_target_usd: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            levels: LevelConfig::default(),
            guards: GuardConfig::default(),
            targeting: TargetingConfig::default(),
            daily_target_usd: 100.0,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs whose bands or multipliers cannot produce valid levels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = &self.levels;
        if levels.low_volatility_below_pct > levels.high_volatility_above_pct {
            return Err(ConfigError::Invalid(
                "levels.low_volatility_below_pct must not exceed high_volatility_above_pct".into(),
            ));
        }
        for (name, profile) in [
            ("low_volatility", levels.low_volatility),
            ("normal", levels.normal),
            ("high_volatility", levels.high_volatility),
        ] {
            if !(profile.sl_mult > 0.0 && profile.tp_mult > 0.0 && profile.tp_fallback_mult > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "levels.{name} multipliers must be positive"
                )));
            }
        }

        let t = &self.targeting;
        if !(t.min_target_fraction > 0.0 && t.min_target_fraction <= t.max_target_fraction) {
            return Err(ConfigError::Invalid(
                "targeting.min_target_fraction must be positive and <= max_target_fraction".into(),
            ));
        }
        if !(t.small_risk_reward > 0.0 && t.mid_risk_reward > 0.0 && t.large_risk_reward > 0.0) {
            return Err(ConfigError::Invalid(
                "targeting risk/reward values must be positive".into(),
            ));
        }
        if t.small_horizon_minutes == 0 || t.mid_horizon_minutes == 0 || t.large_horizon_minutes == 0
        {
            return Err(ConfigError::Invalid(
                "targeting default horizons must be positive".into(),
            ));
        }

        let w = &self.scoring.weights;
        for (name, weight) in [
            ("ema_trend", w.ema_trend),
            ("adx_strength", w.adx_strength),
            ("macd_momentum", w.macd_momentum),
            ("rsi_continuation", w.rsi_continuation),
            ("rsi_reversal", w.rsi_reversal),
            ("stoch_rsi_timing", w.stoch_rsi_timing),
            ("vwap_side", w.vwap_side),
            ("bollinger_stretch", w.bollinger_stretch),
            ("funding_crowding", w.funding_crowding),
            ("premium_crowding", w.premium_crowding),
            ("htf_bias", w.htf_bias),
            ("stable_volatility", w.stable_volatility),
        ] {
            if weight > MAX_SCORE_POINTS {
                return Err(ConfigError::Invalid(format!(
                    "scoring.weights.{name} must be at most {MAX_SCORE_POINTS}"
                )));
            }
        }

        let c = &self.scoring.confidence;
        if [c.strong_base, c.weak_base, c.weak_floor, c.ceiling]
            .iter()
            .any(|v| *v > MAX_SCORE_POINTS)
        {
            return Err(ConfigError::Invalid(format!(
                "scoring.confidence bases and ceiling must be at most {MAX_SCORE_POINTS}"
            )));
        }
        if c.floor > c.ceiling {
            return Err(ConfigError::Invalid(
                "scoring.confidence.floor must not exceed ceiling".into(),
            ));
        }
        if !(self.daily_target_usd > 0.0) {
            return Err(ConfigError::Invalid("daily_target_usd must be positive".into()));
        }
        Ok(())
    }

    /// Deterministic content hash of this config (blake3 over canonical JSON).
    ///
    /// Equal configs always produce equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}
