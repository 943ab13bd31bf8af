use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while formatting measurements or handling run and style files
#[derive(Debug, Error)]
pub enum Error {
    /// The numeric input has no meaningful significant digit to align to
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid observation date: {0}")]
    InvalidDate(String),

    #[error(
        "unknown location {0:?}, available values are: lower left, lower right, upper left, upper right"
    )]
    InvalidLocation(String),

    #[error("unsupported plot style entry: {0}")]
    InvalidStyle(String),

    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    #[error("a {nrows}x{ncols} grid cannot hold {panels} panels")]
    InvalidGrid {
        panels: usize,
        nrows: usize,
        ncols: usize,
    },

    #[error("file {0:?} does not exist")]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed toml: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialise toml: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
