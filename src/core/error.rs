//! Error types for episode construction and configuration.
//!
//! Movement never fails with an error: rejected moves are reported as `false`
//! and an exhausted avoidance search as an unchanged position.

use thiserror::Error;

/// Result type for fallible core operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors surfaced while building or configuring an episode
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Placement exhausted: placed {placed}/{requested} {what} after {attempts} attempts")]
    PlacementExhausted {
        what: &'static str,
        placed: usize,
        requested: usize,
        attempts: usize,
    },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfig(msg.into())
    }
}
