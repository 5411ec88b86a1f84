//! Page rasterization.

use image::DynamicImage;
use log::debug;
use pdfium_render::prelude::*;
use std::path::Path;

use crate::error::{IngestError, Result};

/// PDF points per inch (1 inch = 72 points).
pub const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Reference page height in points used when inferring DPI (US Letter).
pub const DEFAULT_PAGE_HEIGHT_PTS: f32 = 792.0;

/// One rasterized page with its source dimensions.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-based page index
    pub page_index: usize,
    /// Raster at the detection DPI
    pub image: DynamicImage,
    /// PDF page width in points
    pub width_pts: f32,
    /// PDF page height in points
    pub height_pts: f32,
}

impl PageImage {
    /// Raster width in pixels.
    #[inline]
    #[must_use = "returns the raster width"]
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    /// Raster height in pixels.
    #[inline]
    #[must_use = "returns the raster height"]
    pub fn height_px(&self) -> u32 {
        self.image.height()
    }
}

/// Infer the rendering DPI from a raster height and the PDF page height in
/// points: `dpi = ⌊H_img / H_pdf · 72⌋`.
#[inline]
#[must_use = "returns the inferred DPI"]
pub fn dpi_from_page_height(image_height_px: u32, page_height_pts: f32) -> u32 {
    (image_height_px as f32 / page_height_pts * PDF_POINTS_PER_INCH) as u32
}

/// Rasterize every page of a PDF at the given DPI.
///
/// # Errors
///
/// Returns [`IngestError::Pdf`] if the document cannot be loaded, or
/// [`IngestError::InvalidPage`] if a page has degenerate dimensions or
/// fails to render.
pub fn rasterize_pdf(pdf_path: &Path, dpi: u32) -> Result<Vec<PageImage>> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| IngestError::Pdf(format!("failed to load {}: {e}", pdf_path.display())))?;

    let page_count = document.pages().len() as usize;
    debug!("rasterizing {page_count} pages at {dpi} dpi");
    let mut pages = Vec::with_capacity(page_count);

    for (i, page) in document.pages().iter().enumerate() {
        let width_pts = page.width().value;
        let height_pts = page.height().value;
        if width_pts <= 0.0 || height_pts <= 0.0 {
            return Err(IngestError::InvalidPage {
                page_index: i,
                message: format!("degenerate page size {width_pts}x{height_pts} pts"),
            });
        }

        let target_w = (width_pts * dpi as f32 / PDF_POINTS_PER_INCH) as i32;
        let target_h = (height_pts * dpi as f32 / PDF_POINTS_PER_INCH) as i32;
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_w)
            .set_target_height(target_h);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| IngestError::InvalidPage {
                page_index: i,
                message: format!("render failed: {e}"),
            })?;

        pages.push(PageImage {
            page_index: i,
            image: bitmap.as_image(),
            width_pts,
            height_pts,
        });
    }

    Ok(pages)
}
