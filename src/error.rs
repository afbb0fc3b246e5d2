use std::path::PathBuf;

use thiserror::Error;

use crate::types::PairId;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("cached dataset is missing column `{0}`")]
    MissingColumn(&'static str),

    #[error("cached dataset column `{0}` has an unexpected type")]
    ColumnType(&'static str),

    #[error("missing OHLCV value for {pair} at row {index}")]
    MissingValue { pair: PairId, index: usize },

    #[error("timestamps not strictly increasing for {pair} at row {index}")]
    NonMonotonic { pair: PairId, index: usize },

    #[error("market data provider error: {0}")]
    Provider(String),

    #[error("provider returned malformed data: {0}")]
    Malformed(String),
}

impl DataError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("signal frame has {signals} rows but price series has {prices}")]
    LengthMismatch { prices: usize, signals: usize },

    #[error("non-positive or non-finite close {price} at bar {index}")]
    BadPrice { index: usize, price: f64 },

    #[error("invalid cost model: {0}")]
    InvalidCosts(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
