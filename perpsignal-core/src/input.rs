//! Input parsing: symbols, candle intervals, horizons and the trading prompt.
//!
//! Everything here is caller-correctable, so every failure is an
//! [`ErrorKind::Validation`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::ErrorKind;

/// Validation failures for user-supplied inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Symbol is required.")]
    MissingSymbol,

    #[error("Invalid symbol '{0}'. Use base symbol only, e.g. BTC or ETH.")]
    InvalidSymbol(String),

    #[error("Invalid duration '{0}'. Use formats like 15m, 60m, or 1h.")]
    InvalidInterval(String),

    #[error("Invalid horizon '{0}'. Use minutes as a positive integer (e.g. 15, 75, 90).")]
    InvalidHorizon(String),

    #[error("{field} must be a positive number (got {value}).")]
    NonPositive { field: &'static str, value: f64 },

    #[error("Provide either objective or horizon, not both.")]
    ConflictingTargets,

    #[error("Manual levels mode cannot be combined with --objective/--horizon.")]
    ManualLevelsWithObjective,

    #[error("Objective targeting requires leverage and position size.")]
    MissingPositionSizing,

    #[error("Missing value for {0}.")]
    MissingValue(&'static str),

    #[error("Invalid --objective value. Use a positive number.")]
    InvalidObjective,

    #[error(
        "Only -i/--interactive, --manual-levels, --simulate, --objective <USDC>, and --horizon <minutes> are supported after symbol."
    )]
    UnsupportedFlag(String),
}

impl InputError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Normalizes a base symbol: trimmed, uppercased, 2-12 ASCII alphanumerics.
pub fn parse_trading_symbol(raw: &str) -> Result<String, InputError> {
    let normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(InputError::MissingSymbol);
    }
    let valid_len = (2..=12).contains(&normalized.len());
    let valid_chars = normalized
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !valid_len || !valid_chars {
        return Err(InputError::InvalidSymbol(raw.to_string()));
    }
    Ok(normalized)
}

/// Unit of a candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Minutes,
    Hours,
}

const MAX_INTERVAL_HOURS: u32 = u32::MAX / 60;

/// Candle interval such as `1m`, `15m` or `1h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    amount: u32,
    unit: IntervalUnit,
}

impl Interval {
    pub fn minutes(amount: u32) -> Self {
        Self {
            amount: amount.max(1),
            unit: IntervalUnit::Minutes,
        }
    }

    /// Amounts beyond what fits in `u32` minutes are clamped.
    pub fn hours(amount: u32) -> Self {
        Self {
            amount: amount.clamp(1, MAX_INTERVAL_HOURS),
            unit: IntervalUnit::Hours,
        }
    }

    /// Length of one candle in minutes.
    pub fn as_minutes(&self) -> u32 {
        match self.unit {
            IntervalUnit::Minutes => self.amount,
            IntervalUnit::Hours => self.amount * 60,
        }
    }
}

impl FromStr for Interval {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        let invalid = || InputError::InvalidInterval(raw.to_string());
        let unit = match normalized.chars().last() {
            Some('m') => IntervalUnit::Minutes,
            Some('h') => IntervalUnit::Hours,
            _ => return Err(invalid()),
        };
        let digits = &normalized[..normalized.len() - 1];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 || (unit == IntervalUnit::Hours && amount > MAX_INTERVAL_HOURS) {
            return Err(invalid());
        }
        Ok(Self { amount, unit })
    }
}

impl TryFrom<String> for Interval {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            IntervalUnit::Minutes => write!(f, "{}m", self.amount),
            IntervalUnit::Hours => write!(f, "{}h", self.amount),
        }
    }
}

/// Time-stop horizon in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Horizon(u32);

impl Horizon {
    pub fn from_minutes(minutes: u32) -> Result<Self, InputError> {
        if minutes == 0 {
            return Err(InputError::InvalidHorizon(minutes.to_string()));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// Display label such as `"75m"`.
    pub fn label(&self) -> String {
        format!("{}m", self.0)
    }
}

/// Candles of `interval_minutes` needed to cover `horizon_minutes` (ceiling division).
pub fn candles_for_horizon(horizon_minutes: u32, interval_minutes: u32) -> Result<u32, InputError> {
    if horizon_minutes == 0 {
        return Err(InputError::InvalidHorizon(horizon_minutes.to_string()));
    }
    if interval_minutes == 0 {
        return Err(InputError::InvalidInterval(format!("{interval_minutes}m")));
    }
    Ok(horizon_minutes.div_ceil(interval_minutes))
}

impl FromStr for Horizon {
    type Err = InputError;

    /// Digits only: `"90"` parses, `"90m"` does not.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || InputError::InvalidHorizon(raw.to_string());
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let minutes: u32 = trimmed.parse().map_err(|_| invalid())?;
        Self::from_minutes(minutes).map_err(|_| invalid())
    }
}

impl TryFrom<u32> for Horizon {
    type Error = InputError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
    }
}

impl From<Horizon> for u32 {
    fn from(horizon: Horizon) -> Self {
        horizon.0
    }
}

/// Parsed trading prompt: `SYMBOL [flags...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingInput {
    pub symbol: String,
    pub full_interactive: bool,
    pub manual_levels: bool,
    pub run_simulation: bool,
    pub objective_usdc: Option<f64>,
    pub objective_horizon: Option<Horizon>,
}

impl TradingInput {
    /// Pair string for the symbol, quoted in USD.
    pub fn pair(&self) -> String {
        format!("{}-USD", self.symbol)
    }
}

/// Parses a whitespace-separated trading prompt.
pub fn parse_trading_input(raw: &str) -> Result<TradingInput, InputError> {
    let mut parts = raw.split_whitespace();
    let symbol = parse_trading_symbol(parts.next().unwrap_or(""))?;

    let mut input = TradingInput {
        symbol,
        full_interactive: false,
        manual_levels: false,
        run_simulation: false,
        objective_usdc: None,
        objective_horizon: None,
    };

    while let Some(token) = parts.next() {
        match token {
            "-i" | "--interactive" => input.full_interactive = true,
            "--manual-levels" => input.manual_levels = true,
            "--simulate" => input.run_simulation = true,
            "--objective" => {
                let value = parts.next().ok_or(InputError::MissingValue("--objective"))?;
                let parsed: f64 = value.parse().map_err(|_| InputError::InvalidObjective)?;
                if !(parsed > 0.0) || !parsed.is_finite() {
                    return Err(InputError::InvalidObjective);
                }
                input.objective_usdc = Some(parsed);
            }
            "--horizon" => {
                let value = parts.next().ok_or(InputError::MissingValue("--horizon"))?;
                input.objective_horizon = Some(value.parse()?);
            }
            other => return Err(InputError::UnsupportedFlag(other.to_string())),
        }
    }

    let has_objective = input.objective_usdc.is_some() || input.objective_horizon.is_some();
    if input.manual_levels && has_objective {
        return Err(InputError::ManualLevelsWithObjective);
    }
    if input.objective_usdc.is_some() && input.objective_horizon.is_some() {
        return Err(InputError::ConflictingTargets);
    }

    Ok(input)
}
