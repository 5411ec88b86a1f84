//! Error types for study orchestration.

use thiserror::Error;

/// Errors raised while evaluating claims against documents.
///
/// Per-(claim, document) failures are captured inside the study result and
/// do not abort the run; this enum covers those failures plus the
/// study-level ones (claims file, output directory) that do.
#[derive(Error, Debug)]
pub enum StudyError {
    /// Claims file missing, unreadable, or malformed.
    #[error("claims file error: {0}")]
    ClaimsFile(String),

    /// The referenced document has not been ingested.
    #[error("document '{0}' not found in cache")]
    DocumentNotFound(String),

    /// Core store error while loading a document.
    #[error(transparent)]
    Core(#[from] solstice_core::SolsticeError),

    /// The gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// The model's answer could not be parsed into a verdict.
    #[error("unparseable model response: {0}")]
    BadResponse(String),

    /// Output artifact I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for study operations.
pub type Result<T> = std::result::Result<T, StudyError>;
