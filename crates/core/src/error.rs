//! Error types for pipeline operations.
//!
//! Every engine method returns exactly one of these on failure. Validation
//! errors are raised before any store command is issued.

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur while building keys or driving state transitions.
#[derive(Error, Debug)]
pub enum PipeError {
    /// A submitted message failed shape validation. Nothing from the batch was applied.
    #[error("Invalid message at index {index}: {reason}")]
    InvalidMessage { index: usize, reason: String },

    /// A state argument is not part of the configured chain.
    #[error("Invalid state name - {0}")]
    InvalidStateName(String),

    /// `next_state` was asked about a state outside the chain.
    #[error("Invalid source state name - {0}")]
    InvalidSourceState(String),

    /// A key does not match the shape produced by the active configuration.
    #[error("Invalid key format: {key} ({reason})")]
    InvalidKeyFormat { key: String, reason: String },

    /// An identifier is empty or contains the key separator, so its keys could not be parsed back.
    #[error("Invalid identifier '{0}': must be non-empty and free of the key separator")]
    InvalidIdentifier(String),

    /// The pipeline configuration violates a chain or key invariant.
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// `merge` was called without any source state.
    #[error("Merge needs at least one source state")]
    NoMergeSources,

    /// The move transaction could not be built or executed.
    #[error("Error moving data: {0}")]
    MoveFailed(#[source] StoreError),

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An action could not be encoded as a bucket member.
    #[error("Failed to serialize action: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Result with PipeError.
pub type PipeResult<T> = Result<T, PipeError>;
