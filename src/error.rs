//! Typed failures for the dataset loader and the filter selection.
//!
//! Command handlers wrap these in `anyhow` with context; library callers can
//! match on the variants directly.

use std::{io, path::PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("Dataset file {path:?} not found")]
    NotFound { path: PathBuf },
    #[error("Dataset file 'Sample - Superstore.csv' not found in current or parent directory")]
    DefaultNotFound,
    #[error("Opening dataset file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Reading row {row} of {path:?}")]
    Csv {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),
    #[error("Row {row} could not be decoded as {encoding}")]
    Decode { row: usize, encoding: &'static str },
    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Row {row}: failed to parse {column} value '{value}'")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("Unknown filter dimension '{0}'")]
    UnknownDimension(String),
}
