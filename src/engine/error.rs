//! Engine error types

use thiserror::Error;

/// Errors the core engine can produce.
///
/// `DimensionMismatch` and `InvalidCluster` are programming-error class:
/// they cannot occur when embeddings and clusters come from the same run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cluster {0} has an empty member list")]
    InvalidCluster(String),
}
