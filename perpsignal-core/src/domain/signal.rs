//! Direction, signal, action and regime enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a position. The scorer always resolves to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Multiplies a price move into a signed return.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// Signed fractional return from `entry` to `exit` for this side.
    pub fn signed_return(self, entry: f64, exit: f64) -> f64 {
        self.sign() * (exit - entry) / entry
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Final recommendation signal after trade guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Long,
    Short,
    NoTrade,
}

impl Signal {
    /// The position side, or `None` for NO_TRADE.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Long => Some(Direction::Long),
            Signal::Short => Some(Direction::Short),
            Signal::NoTrade => None,
        }
    }

    pub fn is_trade(self) -> bool {
        self != Signal::NoTrade
    }
}

impl From<Direction> for Signal {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Signal::Long,
            Direction::Short => Signal::Short,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::NoTrade => write!(f, "NO_TRADE"),
        }
    }
}

/// Human-facing action label. Mirrors the final signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
    #[serde(rename = "NO TRADE")]
    NoTrade,
}

impl From<Signal> for Action {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Long => Action::Long,
            Signal::Short => Action::Short,
            Signal::NoTrade => Action::NoTrade,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Long => write!(f, "LONG"),
            Action::Short => write!(f, "SHORT"),
            Action::NoTrade => write!(f, "NO TRADE"),
        }
    }
}

/// Whether trend and volatility are clear enough to take trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Tradeable,
    Choppy,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Tradeable => write!(f, "TRADEABLE"),
            Regime::Choppy => write!(f, "CHOPPY"),
        }
    }
}
