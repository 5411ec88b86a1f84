//! Text and figure extraction from the PDF's native layers.
//!
//! Bboxes arrive in page-raster pixel coordinates (y down); the PDF text
//! layer lives in points (y up). With `H_img` the raster height in pixels
//! and `H_pdf` the page height in points, `scale = H_pdf / H_img` and a
//! pixel rect `(x1, y1, x2, y2)` maps to the PDF rect
//! `(x1·s, H_pdf − y2·s, x2·s, H_pdf − y1·s)`.

use image::DynamicImage;
use log::{debug, warn};
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use solstice_core::BoundingBox;
use std::path::Path;

use crate::error::{IngestError, Result};
use crate::page::PDF_POINTS_PER_INCH;

/// Outcome of one block's text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Non-empty text came back
    Ok,
    /// The region exists but has no text layer content
    Empty,
    /// The PDF library failed on this region
    Failed,
}

impl ExtractionStatus {
    /// Metadata string for block persistence.
    #[must_use = "returns the status name"]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Empty => "empty",
            Self::Failed => "failed",
        }
    }
}

/// Text plus how its extraction went.
#[derive(Debug, Clone, PartialEq)]
pub struct TextExtraction {
    /// Raw extracted text (empty on `Empty`/`Failed`)
    pub text: String,
    /// How extraction went
    pub status: ExtractionStatus,
    /// Error message retained for `Failed`
    pub error: Option<String>,
}

/// Native-text-layer extractor backed by pdfium.
///
/// The production implementation of the extractor seam; an OCR backend
/// would be a second implementation selected by configuration.
pub struct PdfExtractor {
    pdfium: Pdfium,
}

impl std::fmt::Debug for PdfExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfExtractor").finish_non_exhaustive()
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor {
    /// Bind the system pdfium library.
    #[must_use = "returns the constructed extractor"]
    pub fn new() -> Self {
        Self {
            pdfium: Pdfium::default(),
        }
    }

    /// Extract text for a batch of bboxes on one page.
    ///
    /// The document is loaded once per call; each bbox is clipped against
    /// the page's text layer independently. Per-bbox failures degrade to
    /// [`ExtractionStatus::Failed`] outcomes instead of failing the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the document or page cannot be opened.
    pub fn extract_page_texts(
        &self,
        pdf_path: &Path,
        page_index: usize,
        bboxes: &[BoundingBox],
        image_height_px: u32,
    ) -> Result<Vec<TextExtraction>> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| IngestError::Pdf(format!("failed to load {}: {e}", pdf_path.display())))?;
        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|e| IngestError::InvalidPage {
                page_index,
                message: format!("page not found: {e}"),
            })?;

        let page_height_pts = page.height().value;
        let scale = page_height_pts / image_height_px as f32;

        let text_page = match page.text() {
            Ok(t) => t,
            Err(e) => {
                // No text layer at all: every bbox comes back empty.
                debug!("page {page_index} has no text layer: {e}");
                return Ok(bboxes
                    .iter()
                    .map(|_| TextExtraction {
                        text: String::new(),
                        status: ExtractionStatus::Empty,
                        error: None,
                    })
                    .collect());
            }
        };

        Ok(bboxes
            .iter()
            .map(|bbox| {
                let rect = PdfRect::new(
                    PdfPoints::new(page_height_pts - bbox.y2 * scale),
                    PdfPoints::new(bbox.x1 * scale),
                    PdfPoints::new(page_height_pts - bbox.y1 * scale),
                    PdfPoints::new(bbox.x2 * scale),
                );
                let text = text_page.inside_rect(rect);
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    TextExtraction {
                        text: String::new(),
                        status: ExtractionStatus::Empty,
                        error: None,
                    }
                } else {
                    TextExtraction {
                        text: trimmed.to_string(),
                        status: ExtractionStatus::Ok,
                        error: None,
                    }
                }
            })
            .collect())
    }

    /// Render a page at `dpi` and crop the region for a figure/table block.
    ///
    /// `bbox` is interpreted in `bbox_dpi` coordinate space (the detection
    /// raster); the crop rectangle is scaled by `dpi / bbox_dpi` into the
    /// fresh render.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be rendered or the scaled crop
    /// falls outside it.
    pub fn render_crop(
        &self,
        pdf_path: &Path,
        page_index: usize,
        bbox: &BoundingBox,
        dpi: u32,
        bbox_dpi: u32,
    ) -> Result<DynamicImage> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| IngestError::Pdf(format!("failed to load {}: {e}", pdf_path.display())))?;
        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|e| IngestError::InvalidPage {
                page_index,
                message: format!("page not found: {e}"),
            })?;

        let width_pts = page.width().value;
        let height_pts = page.height().value;
        let render_config = PdfRenderConfig::new()
            .set_target_width((width_pts * dpi as f32 / PDF_POINTS_PER_INCH) as i32)
            .set_target_height((height_pts * dpi as f32 / PDF_POINTS_PER_INCH) as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| IngestError::InvalidPage {
                page_index,
                message: format!("render failed: {e}"),
            })?;
        let rendered = bitmap.as_image();

        let s = dpi as f32 / bbox_dpi as f32;
        let x = (bbox.x1 * s).max(0.0) as u32;
        let y = (bbox.y1 * s).max(0.0) as u32;
        let w = ((bbox.x2 - bbox.x1) * s) as u32;
        let h = ((bbox.y2 - bbox.y1) * s) as u32;

        if w == 0 || h == 0 || x >= rendered.width() || y >= rendered.height() {
            return Err(IngestError::InvalidPage {
                page_index,
                message: format!("crop {bbox:?} falls outside the rendered page"),
            });
        }
        let w = w.min(rendered.width() - x);
        let h = h.min(rendered.height() - y);

        debug!("cropping page {page_index} at ({x},{y}) {w}x{h} px");
        Ok(rendered.crop_imm(x, y, w, h))
    }

    /// Page count of a PDF.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be opened.
    pub fn page_count(&self, pdf_path: &Path) -> Result<usize> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| IngestError::Pdf(format!("failed to load {}: {e}", pdf_path.display())))?;
        Ok(document.pages().len() as usize)
    }
}

/// Sentinel text recorded on blocks whose extraction failed.
#[must_use = "returns the failure sentinel text"]
pub fn failure_sentinel(role: &str) -> String {
    let role_upper = role.to_uppercase();
    format!("[TEXT EXTRACTION FAILED - {role_upper}]")
}

/// Log and convert a per-block failure into its outcome.
pub(crate) fn failed_extraction(error: impl std::fmt::Display) -> TextExtraction {
    warn!("block text extraction failed: {error}");
    TextExtraction {
        text: String::new(),
        status: ExtractionStatus::Failed,
        error: Some(error.to_string()),
    }
}
