//! Error types for WellPath scoring

use crate::types::ScoreResult;
use thiserror::Error;

/// Errors that can occur while scoring
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown algorithm type: {0}")]
    UnknownAlgorithmType(String),

    #[error("Unknown marker: {0}")]
    UnknownMarker(String),

    /// The window holds fewer usable days than the algorithm needs.
    ///
    /// `partial` is the best-effort result (zero progress, full potential) so callers
    /// can still render something.
    #[error("Insufficient data: need {required} days, got {available}")]
    InsufficientData {
        required: usize,
        available: usize,
        partial: Box<ScoreResult>,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ScoringError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ScoringError::InvalidConfiguration(msg.into())
    }

    /// Well-formed JSON that does not fit the expected schema
    pub(crate) fn from_schema(err: serde_json::Error) -> Self {
        ScoringError::InvalidConfiguration(err.to_string())
    }

    /// Best-effort result attached to an [`ScoringError::InsufficientData`] error
    pub fn partial_result(&self) -> Option<&ScoreResult> {
        match self {
            ScoringError::InsufficientData { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
