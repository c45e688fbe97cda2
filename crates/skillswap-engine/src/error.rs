use thiserror::Error;

use skillswap_store::StoreError;

/// Error taxonomy of the exchange engine.
///
/// Validation and authorization failures are detected before any mutation,
/// so an operation that returns one of these has not partially applied.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The caller is authenticated but not allowed to act on this entity.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The operation is not valid for the exchange's current status.
    #[error("{0}")]
    InvalidState(&'static str),

    /// Malformed or out-of-range input.
    #[error("{0}")]
    InvalidArgument(String),

    /// The payer's balance does not cover the exchange cost.
    #[error("Insufficient points. You need {needed} points but only have {available} points.")]
    InsufficientFunds { needed: i64, available: i64 },

    /// Storage failure. Surfaced to callers as a generic internal error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
