//! Paper-trade evaluation: first-touch resolution over forward candles.
//!
//! Candles are scanned in time order. Within one candle the intrabar path
//! is unknown, so a candle that touches both levels counts as a stop-loss.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{sorted_by_time, Candle, Direction, Recommendation};
use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Unable to evaluate simulation outcome because no candles were available.")]
    NoCandles,

    #[error("Cannot simulate {pair}: recommendation is NO_TRADE.")]
    NotTradeable { pair: String },
}

impl SimulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimulationError::NoCandles => ErrorKind::DataSufficiency,
            SimulationError::NotTradeable { .. } => ErrorKind::Validation,
        }
    }
}

/// Hypothetical position opened at a known time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperTrade {
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub opened_at_ms: i64,
}

impl PaperTrade {
    pub fn from_recommendation(
        rec: &Recommendation,
        opened_at_ms: i64,
    ) -> Result<Self, SimulationError> {
        let direction = rec.direction().ok_or_else(|| SimulationError::NotTradeable {
            pair: rec.pair.clone(),
        })?;
        Ok(Self {
            direction,
            entry: rec.entry,
            stop_loss: rec.stop_loss,
            take_profit: rec.take_profit,
            opened_at_ms,
        })
    }

    /// End of the simulation window `horizon_minutes` after the open.
    ///
    /// Saturates at `i64::MAX` for opens near the end of the range.
    pub fn horizon_end_ms(&self, horizon_minutes: u32) -> i64 {
        self.opened_at_ms
            .saturating_add(i64::from(horizon_minutes) * 60_000)
    }

    fn touches(&self, candle: &Candle) -> (bool, bool) {
        match self.direction {
            Direction::Long => (
                candle.low <= self.stop_loss,
                candle.high >= self.take_profit,
            ),
            Direction::Short => (
                candle.high >= self.stop_loss,
                candle.low <= self.take_profit,
            ),
        }
    }

    /// Signed return in percent at `exit`.
    pub fn pnl_pct(&self, exit: f64) -> f64 {
        self.direction.signed_return(self.entry, exit) * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// How the position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    TakeProfit,
    StopLoss,
    /// Both levels inside one candle; resolved as a stop.
    AmbiguousStopLoss,
    /// Neither level touched; closed at the last close in the window.
    TimeStop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub status: OutcomeStatus,
    pub exit_kind: ExitKind,
    pub reason: String,
    pub exit_price: f64,
    pub pnl_pct: f64,
}

impl SimulationOutcome {
    /// Outcome for a candle that touched at least one level. Stop wins ties.
    fn level_touch(trade: &PaperTrade, stop_hit: bool, take_hit: bool) -> Option<Self> {
        let (exit_kind, status, exit_price, reason) = match (stop_hit, take_hit) {
            (true, true) => (
                ExitKind::AmbiguousStopLoss,
                OutcomeStatus::Failure,
                trade.stop_loss,
                "Both SL and TP were touched in the same candle; counted as stop-loss.",
            ),
            (true, false) => (
                ExitKind::StopLoss,
                OutcomeStatus::Failure,
                trade.stop_loss,
                "Stop-loss was hit within the simulation window.",
            ),
            (false, true) => (
                ExitKind::TakeProfit,
                OutcomeStatus::Success,
                trade.take_profit,
                "Take-profit was hit within the simulation window.",
            ),
            (false, false) => return None,
        };
        Some(Self {
            status,
            exit_kind,
            reason: reason.into(),
            exit_price,
            pnl_pct: trade.pnl_pct(exit_price),
        })
    }
}

/// Resolves a paper trade against candles in `(opened_at, horizon_end]`.
///
/// The first candle touching a level decides. If none does, the position
/// closes at the last in-window close, or failing that the last close at
/// or before `horizon_end_ms`.
pub fn evaluate_paper_trade(
    trade: &PaperTrade,
    candles: &[Candle],
    horizon_end_ms: i64,
) -> Result<SimulationOutcome, SimulationError> {
    let sorted = sorted_by_time(candles);
    let window = sorted
        .iter()
        .filter(|c| c.timestamp > trade.opened_at_ms && c.timestamp <= horizon_end_ms);

    let mut last_in_window = None;
    for candle in window {
        let (stop_hit, take_hit) = trade.touches(candle);
        if let Some(outcome) = SimulationOutcome::level_touch(trade, stop_hit, take_hit) {
            return Ok(outcome);
        }
        last_in_window = Some(candle);
    }

    let fallback = last_in_window
        .or_else(|| sorted.iter().rev().find(|c| c.timestamp <= horizon_end_ms))
        .ok_or(SimulationError::NoCandles)?;

    let exit_price = fallback.close;
    let pnl_pct = trade.pnl_pct(exit_price);
    let (status, reason) = if pnl_pct >= 0.0 {
        (
            OutcomeStatus::Success,
            "No SL/TP hit; position closed at horizon with positive PnL.",
        )
    } else {
        (
            OutcomeStatus::Failure,
            "No SL/TP hit; position closed at horizon with negative PnL.",
        )
    };
    Ok(SimulationOutcome {
        status,
        exit_kind: ExitKind::TimeStop,
        reason: reason.into(),
        exit_price,
        pnl_pct,
    })
}
