//! Custom error types for the WinSentinel analysis core.
//!
//! Dataset-level failures are fatal and surface as a single `SentinelError`.
//! Reasoning-provider failures never appear here; the AI cascade recovers
//! them locally (see `crate::ai::ProviderError`).

use std::path::PathBuf;

/// The main error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// I/O error (dataset read, output write, permissions)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Dataset contains no records
    #[error("Empty dataset")]
    EmptyDataset,

    /// A required column is absent
    #[error("Missing \"{column}\" column. Found: {found:?}")]
    MissingColumn { column: String, found: Vec<String> },

    /// A timestamp value could not be parsed
    #[error("Unparsable timestamp at row {row}: '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    /// None of the requested feature columns exist
    #[error("No usable feature columns (requested {requested:?})")]
    NoFeatures { requested: Vec<String> },

    /// Feature matrix row has the wrong width
    #[error("Feature matrix shape mismatch at row {row}: expected {expected} columns, found {found}")]
    Shape {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Dataset format not recognised from its extension
    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Tokio task join error
    #[error("Async task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type alias using SentinelError
pub type SentinelResult<T> = Result<T, SentinelError>;

impl SentinelError {
    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures caused by the input itself rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyDataset
                | Self::MissingColumn { .. }
                | Self::InvalidTimestamp { .. }
                | Self::NoFeatures { .. }
                | Self::Shape { .. }
                | Self::UnsupportedFormat(_)
                | Self::Csv(_)
                | Self::Json(_)
        )
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for SentinelError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
