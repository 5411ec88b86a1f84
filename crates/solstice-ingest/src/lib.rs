//! # solstice-ingest
//!
//! The ingestion pipeline: PDF in, canonical block-addressable
//! [`solstice_core::Document`] out.
//!
//! Stages, in order:
//!
//! 1. rasterize each page at the detection DPI ([`page`]);
//! 2. run a pretrained layout model over the rasters ([`detector`]);
//! 3. expand the raw boxes and resolve their overlaps
//!    (`solstice_layout`);
//! 4. assign a per-page reading order;
//! 5. extract text from the PDF's native layer and render figure/table
//!    crops ([`extract`]), repairing extraction artifacts with the text
//!    post-processing chain ([`textproc`]);
//! 6. persist everything under the per-document cache layout.
//!
//! The detector is a trait seam: production uses the ONNX backend, tests
//! replay recorded detections through [`detector::MockDetector`]. Given the
//! same PDF, configuration, and model weights, a run is deterministic and
//! `content.json` is byte-identical.

pub mod detector;
pub mod error;
pub mod extract;
pub mod page;
pub mod pipeline;
pub mod textproc;
pub mod viz;

pub use detector::{DetectorConfig, LabelMap, LayoutDetector, MockDetector, OnnxLayoutDetector, RawDetection};
pub use error::{IngestError, Result};
pub use extract::{failure_sentinel, ExtractionStatus, PdfExtractor, TextExtraction};
pub use page::{dpi_from_page_height, rasterize_pdf, PageImage};
pub use pipeline::{ingest, IngestConfig};
pub use textproc::{ProcessedText, TextPipeline, TextProcessor};
