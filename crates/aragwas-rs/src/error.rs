//! Error types for the association ranking engine.

use thiserror::Error;

/// Every failure the engine can surface to its caller.
///
/// Source failures carry the study id and a description of the source so a
/// higher layer can log and retry without re-deriving context.
#[derive(Debug, Error)]
pub enum RankError {
    /// The dataset for a study could not be opened or read.
    #[error("association source unavailable for study '{study_id}' ({source_ref}): {cause}")]
    SourceUnavailable {
        study_id: String,
        source_ref: String,
        #[source]
        cause: std::io::Error,
    },

    /// Required columns are missing or hold values of the wrong type.
    #[error("malformed association data for study '{study_id}' ({source_ref}): {message}")]
    MalformedData {
        study_id: String,
        source_ref: String,
        message: String,
    },

    /// The table has no records, so thresholds are undefined.
    #[error("association table for study '{study_id}' is empty")]
    EmptyTable { study_id: String },

    /// Unrecognised selection mode, cutoff unit or regroup key.
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// Non-positive top-N, non-finite cutoff, or out-of-range level.
    #[error("invalid cutoff: {0}")]
    InvalidCutoff(String),

    /// I/O error while writing results.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialisation error while writing results.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RankError>;

impl RankError {
    pub fn source_unavailable(
        study_id: impl Into<String>,
        source_ref: impl Into<String>,
        cause: std::io::Error,
    ) -> Self {
        Self::SourceUnavailable {
            study_id: study_id.into(),
            source_ref: source_ref.into(),
            cause,
        }
    }

    pub fn malformed(
        study_id: impl Into<String>,
        source_ref: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedData {
            study_id: study_id.into(),
            source_ref: source_ref.into(),
            message: message.into(),
        }
    }

    pub fn empty(study_id: impl Into<String>) -> Self {
        Self::EmptyTable {
            study_id: study_id.into(),
        }
    }

    pub fn invalid_mode(message: impl Into<String>) -> Self {
        Self::InvalidMode(message.into())
    }

    pub fn invalid_cutoff(message: impl Into<String>) -> Self {
        Self::InvalidCutoff(message.into())
    }

    /// Only an unavailable source is worth retrying; everything else is
    /// either bad data or a caller error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RankError::SourceUnavailable { .. })
    }
}
