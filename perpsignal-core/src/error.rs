//! Error classification shared by every fallible core operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-distinguishable category of a failure.
///
/// Callers branch on the kind; the error's `Display` text is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-correctable input: bad numbers, conflicting modes, malformed strings.
    Validation,
    /// A level-construction invariant broke. Indicates a logic defect.
    Invariant,
    /// Not enough data to produce an answer.
    DataSufficiency,
    /// Configuration file could not be read or parsed.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Invariant => write!(f, "invariant"),
            ErrorKind::DataSufficiency => write!(f, "data_sufficiency"),
            ErrorKind::Config => write!(f, "config"),
        }
    }
}
