//! Error types for the Solstice core data model and cache store.

use std::path::PathBuf;
use thiserror::Error;

/// Error types that can occur in the core data model and cache store.
///
/// Geometric operations are total and never produce errors; this enum covers
/// validation of constructed values, document-invariant checks, and
/// filesystem access in the path store.
#[derive(Error, Debug)]
pub enum SolsticeError {
    /// A bounding box failed the `x1 < x2 && y1 < y2` construction invariant.
    #[error("invalid bbox ({x1}, {y1}, {x2}, {y2}): expected x1 < x2 and y1 < y2")]
    InvalidBBox {
        /// Left edge
        x1: f32,
        /// Top edge
        y1: f32,
        /// Right edge
        x2: f32,
        /// Bottom edge
        y2: f32,
    },

    /// A persisted document violated one of its structural invariants.
    #[error("document invariant violated: {0}")]
    InvalidDocument(String),

    /// File I/O error with the path that triggered it.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SolsticeError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, SolsticeError>;
