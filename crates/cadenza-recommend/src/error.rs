//! Error types for the similarity engine.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a cached model cannot be used.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cached model exists.
    #[error("no cached model at {}", .0.display())]
    Missing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache file is not valid JSON for the expected layout.
    #[error("corrupt cache: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("unsupported cache format version {0}")]
    UnsupportedVersion(u32),

    /// The cache file parsed but violates a model invariant.
    #[error("invalid cached model: {0}")]
    Invalid(String),
}

impl From<cadenza_som::SomError> for CacheError {
    fn from(error: cadenza_som::SomError) -> Self {
        Self::Invalid(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The catalog or feature source failed.
    #[error("catalog error: {0}")]
    Catalog(cadenza_core::Error),

    /// A configured feature is not in the registry.
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),

    #[error("invalid train settings: {0}")]
    InvalidSettings(String),
}

impl From<cadenza_core::Error> for EngineError {
    fn from(error: cadenza_core::Error) -> Self {
        match error {
            cadenza_core::Error::UnknownFeature(name) => Self::UnknownFeature(name),
            other => Self::Catalog(other),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
