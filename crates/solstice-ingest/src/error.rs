//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Errors produced while turning a PDF into a [`solstice_core::Document`].
///
/// Per-block extraction failures are NOT errors: they are recorded in block
/// metadata and the document still persists. This enum covers failures that
/// abort the current ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The PDF could not be opened or rendered.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The layout detector failed to load or run.
    #[error("detector error: {0}")]
    Detector(String),

    /// A page had invalid dimensions or could not be rasterized.
    #[error("invalid page {page_index}: {message}")]
    InvalidPage {
        /// 0-based page index
        page_index: usize,
        /// What went wrong
        message: String,
    },

    /// Core store or data-model error.
    #[error(transparent)]
    Core(#[from] solstice_core::SolsticeError),

    /// Image encoding error while persisting rasters or crops.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O outside the core store helpers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
