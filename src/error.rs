use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Error type returned by every conversion entrypoint.
///
/// Each variant carries enough context (offending path, bad index and valid range) to diagnose a
/// failure without inspecting internals.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The source path does not exist.
    #[error("input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The source has no header or no data rows.
    #[error("input file has no data rows: {}", path.display())]
    EmptyInput { path: PathBuf },

    /// A requested row index is negative or past the last row.
    #[error("row index {index} out of range (valid range: 0-{})", row_count.saturating_sub(1))]
    IndexOutOfRange { index: isize, row_count: usize },

    /// Any other read/parse/transform failure.
    #[error("failed to process {}: {source}", path.display())]
    Processing {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    /// Output could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Underlying cause of a [`ConversionError::Processing`] failure.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O error while reading the source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited text (ragged rows, invalid UTF-8, ...).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed JSON when reading records back.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value could not be parsed into its column's [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    Parse {
        row: u64,
        column: String,
        raw: String,
        message: String,
    },
}

impl ConversionError {
    pub(crate) fn processing(path: impl Into<PathBuf>, source: impl Into<SourceError>) -> Self {
        Self::Processing {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the failure originated from the filesystem rather than from the data.
    pub fn is_io(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::Write { .. } => true,
            Self::Processing { source, .. } => match source {
                SourceError::Io(_) => true,
                SourceError::Csv(err) => matches!(err.kind(), csv::ErrorKind::Io(_)),
                SourceError::Json(err) => err.is_io(),
                SourceError::Parse { .. } => false,
            },
            Self::EmptyInput { .. } | Self::IndexOutOfRange { .. } => false,
        }
    }
}
