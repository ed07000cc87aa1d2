//! Error types for the projection pipeline

use thiserror::Error;

/// Result type for projection operations
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Errors raised while projecting, coloring or assembling embedding groups.
///
/// Only [`ProjectionError::InsufficientData`] and
/// [`ProjectionError::DecompositionFailure`] are per-group conditions; the projector
/// logs and skips those. Every other variant aborts the call.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// No groups were handed to the projector
    #[error("no groups to project")]
    EmptyInput,

    /// A point's vector length differs from the rest of its group
    #[error("group '{group}': point '{point}' has {found} values, expected {expected}")]
    MismatchedDimensions {
        group: String,
        point: String,
        expected: usize,
        found: usize,
    },

    #[error("target dimension must be 2 or 3, got {0}")]
    InvalidTargetDimension(usize),

    /// Linear projection cannot produce more components than input dimensions
    #[error("group '{group}': target dimension {target} exceeds source dimension {source_dim}")]
    TargetExceedsSource {
        group: String,
        target: usize,
        source_dim: usize,
    },

    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("expected at least {expected} colors, got {found}")]
    ColorCountMismatch { expected: usize, found: usize },

    #[error("invalid color '{0}'")]
    InvalidColor(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Too few points for a meaningful projection
    #[error("group '{group}': low number of items: {points}")]
    InsufficientData { group: String, points: usize },

    /// The numerical decomposition or optimization did not yield usable output
    #[error("group '{group}': projection failed: {reason}")]
    DecompositionFailure { group: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProjectionError {
    /// Whether the error only concerns a single group and the batch may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProjectionError::InsufficientData { .. } | ProjectionError::DecompositionFailure { .. }
        )
    }

    pub(crate) fn decomposition(group: &str, reason: impl Into<String>) -> Self {
        ProjectionError::DecompositionFailure {
            group: group.to_string(),
            reason: reason.into(),
        }
    }
}
