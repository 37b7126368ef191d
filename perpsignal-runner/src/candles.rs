//! CSV candle loading.
//!
//! Expected header: `timestamp,open,high,low,close,volume`, with the
//! timestamp in epoch milliseconds.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use perpsignal_core::Candle;

#[derive(Debug, Error)]
pub enum CandleLoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed candle CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: candle is not a valid OHLC bar")]
    InvalidCandle { row: usize },
}

/// Reads candles from any CSV source, rejecting non-finite or inverted bars.
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>, CandleLoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    for (i, record) in rdr.deserialize::<Candle>().enumerate() {
        let candle = record?;
        if !candle.is_sane() {
            return Err(CandleLoadError::InvalidCandle { row: i + 1 });
        }
        candles.push(candle);
    }
    Ok(candles)
}

pub fn load_candles_csv(path: &Path) -> Result<Vec<Candle>, CandleLoadError> {
    let file = std::fs::File::open(path).map_err(|source| CandleLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_candles(file)
}
