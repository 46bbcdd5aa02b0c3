//! Error types for density estimation.
//!
//! Every fallible operation in this crate returns [`Result<T>`], an alias over
//! [`KdeError`]. Construction-time errors are surfaced immediately; nothing is
//! retried or silently replaced with a default.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KdeError {
    /// The caller asked for a feature this estimator does not implement
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Length mismatch: expected {expected} weights, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid iteration count: {0}")]
    InvalidIterationCount(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid samples: {0}")]
    InvalidSamples(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Query points whose dimensionality does not match the fitted data
    #[error("Dimension mismatch: estimator is {expected}-dimensional, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Singular covariance: {0}")]
    SingularCovariance(String),

    #[error("Bootstrap ensemble has no members to evaluate")]
    EmptyEnsemble,
}

impl KdeError {
    /// Create an Unsupported error with a message
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create an InvalidIterationCount error with a message
    pub fn invalid_iteration_count(message: impl Into<String>) -> Self {
        Self::InvalidIterationCount(message.into())
    }

    /// Create an InvalidWeights error with a message
    pub fn invalid_weights(message: impl Into<String>) -> Self {
        Self::InvalidWeights(message.into())
    }

    /// Create an InvalidSamples error with a message
    pub fn invalid_samples(message: impl Into<String>) -> Self {
        Self::InvalidSamples(message.into())
    }

    /// Create an InvalidConfig error with a message
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a SingularCovariance error with a message
    pub fn singular_covariance(message: impl Into<String>) -> Self {
        Self::SingularCovariance(message.into())
    }
}

pub type Result<T> = std::result::Result<T, KdeError>;
