//! Error types for the bookwise-ml crate.

use thiserror::Error;

/// Top-level error type for dataset preparation.
#[derive(Debug, Error)]
pub enum PrepError {
    /// A required column is missing or a cell could not be parsed.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A source location could not be resolved or read.
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    pub fn data_format(msg: impl Into<String>) -> Self {
        Self::DataFormat(msg.into())
    }

    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Prefix a format error with where it happened; other variants are untouched.
    pub(crate) fn with_prefix(self, prefix: &str) -> Self {
        match self {
            Self::DataFormat(msg) => Self::DataFormat(format!("{prefix}: {msg}")),
            other => other,
        }
    }

    pub(crate) fn in_column(self, column: &str) -> Self {
        self.with_prefix(&format!("column '{column}'"))
    }
}

impl From<csv::Error> for PrepError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            Self::DataSource(err.to_string())
        } else {
            Self::DataFormat(err.to_string())
        }
    }
}

impl From<Box<figment::Error>> for PrepError {
    fn from(err: Box<figment::Error>) -> Self {
        Self::Config(err.to_string())
    }
}
