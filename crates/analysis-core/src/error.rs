use thiserror::Error;

use crate::AnalysisSource;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed bars. Never fatal on its own; degrades confidence.
    #[error("Data quality: {0}")]
    DataQuality(String),

    #[error("Upstream failure ({analysis}): {reason}")]
    UpstreamFailure {
        analysis: AnalysisSource,
        reason: String,
    },
}

impl AnalysisError {
    pub fn upstream(analysis: AnalysisSource, reason: impl Into<String>) -> Self {
        AnalysisError::UpstreamFailure {
            analysis,
            reason: reason.into(),
        }
    }

    /// Only collaborator failures are worth retrying; bad input stays bad.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::UpstreamFailure { .. })
    }
}
