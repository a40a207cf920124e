//! Errors raised when assembling a network from stored parts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SomError {
    /// A vector does not have the network's dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The grid shape does not match the number of reference vectors.
    #[error("invalid grid {width}x{height} with {cells} reference vectors")]
    InvalidGrid {
        width: u32,
        height: u32,
        cells: usize,
    },

    /// A stored value is not a finite number.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

pub type SomResult<T> = std::result::Result<T, SomError>;
