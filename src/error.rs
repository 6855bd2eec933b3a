//! Error types for the resolution engine.
//!
//! Abstention is not an error: a resolver that finds no evidence for a toponym
//! leaves its selection unset. These types cover the genuinely exceptional cases.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for resolver and corpus operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Resolver and corpus failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// `train` was called on a resolver that has no training step.
    #[error("Unsupported operation: resolver '{0}' cannot be trained")]
    TrainingUnsupported(&'static str),

    /// A selection or gold index points past the end of the candidate list.
    #[error("Index {index} out of range for toponym '{form}' with {ambiguity} candidate(s)")]
    SelectionOutOfRange {
        form: String,
        index: usize,
        ambiguity: usize,
    },

    /// The same surface form arrived with a different candidate list than
    /// the one its weights were recorded against.
    #[error("Toponym '{form}' has candidates {found:?} but {expected:?} were recorded during training")]
    InconsistentCandidates {
        form: String,
        expected: Vec<u64>,
        found: Vec<u64>,
    },

    /// A corpus violates a structural invariant.
    #[error("Invalid corpus: {0}")]
    InvalidCorpus(String),

    /// Invalid hyperparameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Geo(#[from] GeoError),
}

impl ResolveError {
    /// Create an invalid corpus error.
    #[must_use]
    pub fn invalid_corpus(msg: impl Into<String>) -> Self {
        Self::InvalidCorpus(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Geometry construction failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Region needs at least one representative coordinate")]
    EmptyRegion,

    #[error("Invalid coordinate ({lat}, {lon}): latitude must be in -90..90 and longitude in -180..180")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Degrees per cell must be positive and divide 180, got {0}")]
    InvalidCellSize(f64),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ResolveError),
}
