//! Ingestion orchestrator.
//!
//! `ingest` drives the full pipeline for one PDF: rasterize → detect →
//! expand → resolve overlaps → assign reading order → extract text and
//! figures → persist the canonical `Document`. Every intermediate artifact
//! lands in the per-document cache layout so a run can be inspected stage
//! by stage.

use log::{info, warn};
use rayon::prelude::*;
use serde_json::json;
use solstice_core::{
    document_id, write_json_pretty, Block, BlockRole, BoundingBox, Document, DocumentMetadata,
    DocumentPaths, LayoutBox, PipelineMetadata,
};
use solstice_layout::{
    expand_boxes, hybrid_order, resolve_all, simple_order, OrderPolicy, ResolverConfig,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::detector::{LayoutDetector, RawDetection};
use crate::error::{IngestError, Result};
use crate::extract::{failure_sentinel, ExtractionStatus, PdfExtractor, TextExtraction};
use crate::page::{rasterize_pdf, PageImage};
use crate::textproc::TextPipeline;
use crate::viz::annotate_page;

/// Configuration of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Cache root all artifacts are persisted under
    pub cache_root: PathBuf,
    /// Rasterization DPI for detection (default 400)
    pub detection_dpi: u32,
    /// DPI at which figure/table crops are rendered (default 300)
    pub figure_dpi: u32,
    /// Uniform box expansion in pixels before resolution (default 5.0)
    pub box_padding: f32,
    /// Overlap-resolver thresholds
    pub resolver: ResolverConfig,
    /// Reading-order policy
    pub order_policy: OrderPolicy,
    /// Pipeline name recorded in document metadata
    pub pipeline_name: String,
    /// Persist `merged/merged_boxes.json`
    pub save_intermediates: bool,
    /// Persist raw-layout visualizations
    pub save_visualizations: bool,
}

impl IngestConfig {
    /// Clinical-document defaults.
    #[must_use = "returns the ingestion configuration"]
    pub fn clinical(cache_root: PathBuf) -> Self {
        Self {
            cache_root,
            detection_dpi: 400,
            figure_dpi: 300,
            box_padding: 5.0,
            resolver: ResolverConfig::clinical(),
            order_policy: OrderPolicy::Simple,
            pipeline_name: "clinical".to_string(),
            save_intermediates: true,
            save_visualizations: false,
        }
    }

    /// Marketing-material defaults: hybrid ordering, marketing thresholds.
    #[must_use = "returns the ingestion configuration"]
    pub fn marketing(cache_root: PathBuf) -> Self {
        Self {
            resolver: ResolverConfig::marketing(),
            order_policy: OrderPolicy::Hybrid,
            pipeline_name: "marketing".to_string(),
            ..Self::clinical(cache_root)
        }
    }
}

/// Ingest one PDF into a persisted [`Document`].
///
/// # Errors
///
/// Fails on unreadable PDFs, detector failures, and cache-store I/O.
/// Per-block extraction failures do NOT fail the run; they are recorded in
/// block metadata with a sentinel text.
pub fn ingest(
    pdf_path: &Path,
    detector: &dyn LayoutDetector,
    config: &IngestConfig,
) -> Result<Document> {
    let doc_id = document_id(pdf_path);
    let paths = DocumentPaths::new(&config.cache_root, &doc_id);
    info!(
        "ingesting {} as '{doc_id}' ({} pipeline)",
        pdf_path.display(),
        config.pipeline_name
    );

    // Stage 1: rasterize and persist page images
    let pages = rasterize_pdf(pdf_path, config.detection_dpi)?;
    fs::create_dir_all(paths.pages_dir()).map_err(IngestError::Io)?;
    for page in &pages {
        page.image.save(paths.page_image(page.page_index))?;
    }

    // Stage 2: detect raw layout boxes
    let raw = detector.detect(&pages)?;
    let raw_detection_count: usize = raw.iter().map(Vec::len).sum();
    write_json_pretty(&paths.raw_boxes_json(), &raw)?;
    if config.save_visualizations {
        for (page, detections) in pages.iter().zip(&raw) {
            let annotated = annotate_page(&page.image, detections);
            let viz_path = paths.raw_visualization(page.page_index);
            if let Some(parent) = viz_path.parent() {
                fs::create_dir_all(parent).map_err(IngestError::Io)?;
            }
            annotated.save(viz_path)?;
        }
    }

    // Stage 3: expand and resolve overlaps, page-parallel (pure compute)
    let resolved_pages: Vec<Vec<LayoutBox>> = pages
        .par_iter()
        .zip(raw.par_iter())
        .map(|(page, detections)| {
            let boxes = to_layout_boxes(page.page_index, detections);
            let page_w = page.width_px() as f32;
            let page_h = page.height_px() as f32;
            let expanded = expand_boxes(boxes, config.box_padding, Some(page_w), Some(page_h));
            resolve_all(expanded, page_w, page_h, &config.resolver)
        })
        .collect();
    let after_consolidation_count: usize = resolved_pages.iter().map(Vec::len).sum();
    if config.save_intermediates {
        write_json_pretty(&paths.merged_boxes_json(), &resolved_pages)?;
    }

    // Stage 4: reading order
    let reading_order: Vec<Vec<String>> = pages
        .iter()
        .zip(&resolved_pages)
        .map(|(page, boxes)| {
            let page_w = page.width_px() as f32;
            let page_h = page.height_px() as f32;
            match config.order_policy {
                OrderPolicy::Simple => simple_order(boxes, page_w, page_h),
                OrderPolicy::Hybrid => hybrid_order(boxes, page_w, page_h),
            }
        })
        .collect();

    // Stage 5: blocks with text / figure content
    let extractor = PdfExtractor::new();
    let text_pipeline = TextPipeline::standard();
    let mut blocks = Vec::with_capacity(after_consolidation_count);
    for (page, boxes) in pages.iter().zip(&resolved_pages) {
        let page_order = &reading_order[page.page_index];
        blocks.extend(build_page_blocks(
            pdf_path,
            page,
            boxes,
            page_order,
            &paths,
            &extractor,
            &text_pipeline,
            config,
        )?);
    }

    let document = Document {
        source_pdf: pdf_path.display().to_string(),
        metadata: DocumentMetadata {
            total_pages: pages.len(),
            detection_dpi: config.detection_dpi,
            pipeline: config.pipeline_name.clone(),
        },
        pipeline_metadata: PipelineMetadata {
            raw_detection_count,
            after_consolidation_count,
            final_block_count: blocks.len(),
            id_format: PipelineMetadata::standard_id_format(),
        },
        blocks,
        reading_order,
    };
    document.validate()?;

    // Stage 6: persist
    write_json_pretty(&paths.content_json(), &document)?;
    info!(
        "ingested '{doc_id}': {} raw -> {} resolved -> {} blocks over {} pages",
        raw_detection_count,
        after_consolidation_count,
        document.pipeline_metadata.final_block_count,
        document.metadata.total_pages
    );

    Ok(document)
}

/// Convert raw detections to boxes with `det_<page>_<NNN>` IDs in detector
/// output order.
fn to_layout_boxes(page_index: usize, detections: &[RawDetection]) -> Vec<LayoutBox> {
    detections
        .iter()
        .enumerate()
        .filter_map(|(i, det)| {
            let [x1, y1, x2, y2] = det.bbox;
            match BoundingBox::new(x1, y1, x2, y2) {
                Ok(bbox) => Some(LayoutBox::detection(page_index, i, bbox, det.label, det.score)),
                Err(e) => {
                    warn!("discarding degenerate detection on page {page_index}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Build the blocks for one page, in reading order.
#[allow(clippy::too_many_arguments)]
fn build_page_blocks(
    pdf_path: &Path,
    page: &PageImage,
    boxes: &[LayoutBox],
    page_order: &[String],
    paths: &DocumentPaths,
    extractor: &PdfExtractor,
    text_pipeline: &TextPipeline,
    config: &IngestConfig,
) -> Result<Vec<Block>> {
    let ordered: Vec<&LayoutBox> = page_order
        .iter()
        .filter_map(|id| boxes.iter().find(|b| &b.id == id))
        .collect();

    // Batch text extraction over the textual boxes
    let textual: Vec<&LayoutBox> = ordered
        .iter()
        .copied()
        .filter(|b| !BlockRole::from(b.label).is_graphical())
        .collect();
    let bboxes: Vec<BoundingBox> = textual.iter().map(|b| b.bbox).collect();
    let extractions = match extractor.extract_page_texts(
        pdf_path,
        page.page_index,
        &bboxes,
        page.height_px(),
    ) {
        Ok(batch) => batch,
        Err(e) => {
            // The page-level failure degrades to per-block failures.
            warn!("text extraction failed for page {}: {e}", page.page_index);
            textual
                .iter()
                .map(|_| crate::extract::failed_extraction(&e))
                .collect()
        }
    };
    let mut extraction_by_id: BTreeMap<&str, &TextExtraction> = BTreeMap::new();
    for (layout_box, extraction) in textual.iter().zip(&extractions) {
        extraction_by_id.insert(layout_box.id.as_str(), extraction);
    }

    let mut blocks = Vec::with_capacity(ordered.len());
    for (position, layout_box) in ordered.iter().enumerate() {
        let role = BlockRole::from(layout_box.label);
        let mut block = Block {
            id: layout_box.id.clone(),
            page_index: page.page_index,
            role,
            bbox: layout_box.bbox,
            text: None,
            image_path: None,
            metadata: BTreeMap::new(),
        };
        block.set_meta("score", json!(layout_box.score));
        block.set_meta("detection_dpi", json!(config.detection_dpi));
        block.set_meta("label", json!(layout_box.label.to_string()));
        if let Some(reason) = &layout_box.merge_reason {
            block.set_meta("merge_reason", json!(reason));
        }
        if !layout_box.source_ids.is_empty() {
            block.set_meta("source_ids", json!(layout_box.source_ids));
        }

        if role.is_graphical() {
            fill_graphical_block(
                &mut block,
                pdf_path,
                page,
                layout_box,
                position,
                paths,
                extractor,
                config,
            )?;
        } else {
            fill_textual_block(&mut block, extraction_by_id.get(layout_box.id.as_str()).copied(), text_pipeline);
        }

        blocks.push(block);
    }

    Ok(blocks)
}

/// Populate a text/title/list block from its extraction outcome.
fn fill_textual_block(
    block: &mut Block,
    extraction: Option<&TextExtraction>,
    text_pipeline: &TextPipeline,
) {
    match extraction {
        Some(extraction) => {
            block.set_meta("extraction_status", json!(extraction.status.as_str()));
            match extraction.status {
                ExtractionStatus::Ok => {
                    let processed = text_pipeline.process(&extraction.text);
                    if !processed.modified_by.is_empty() {
                        block.set_meta("processors", json!(processed.modified_by));
                    }
                    block.text = Some(processed.text);
                }
                ExtractionStatus::Empty => {
                    block.text = Some(String::new());
                }
                ExtractionStatus::Failed => {
                    block.text = Some(failure_sentinel(&block.role.to_string()));
                    if let Some(error) = &extraction.error {
                        block.set_meta("extraction_error", json!(error));
                    }
                }
            }
        }
        None => {
            // Box disappeared between ordering and extraction: treat as empty
            block.set_meta("extraction_status", json!("empty"));
            block.text = Some(String::new());
        }
    }
}

/// Populate a figure/table block: render, crop, save, placeholder text.
#[allow(clippy::too_many_arguments)]
fn fill_graphical_block(
    block: &mut Block,
    pdf_path: &Path,
    page: &PageImage,
    layout_box: &LayoutBox,
    position: usize,
    paths: &DocumentPaths,
    extractor: &PdfExtractor,
    config: &IngestConfig,
) -> Result<()> {
    let role_lower = block.role.as_lower();
    let image_path = paths.figure_image(role_lower, page.page_index, &layout_box.id);

    match extractor.render_crop(
        pdf_path,
        page.page_index,
        &layout_box.bbox,
        config.figure_dpi,
        config.detection_dpi,
    ) {
        Ok(crop) => {
            if let Some(parent) = image_path.parent() {
                fs::create_dir_all(parent).map_err(IngestError::Io)?;
            }
            crop.save(&image_path)?;

            let relative = format!("figures/{}", file_name(&image_path));
            let role_upper = block.role.to_string().to_uppercase();
            block.text = Some(format!(
                "[{role_upper} [{}] - See {}]",
                position + 1,
                file_name(&image_path)
            ));
            block.image_path = Some(relative);
            block.set_meta("extraction_status", json!("ok"));
        }
        Err(e) => {
            warn!("figure crop failed for {}: {e}", layout_box.id);
            block.text = Some(failure_sentinel(&block.role.to_string()));
            block.set_meta("extraction_status", json!("failed"));
            block.set_meta("extraction_error", json!(e.to_string()));
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstice_core::BoxLabel;

    #[test]
    fn test_to_layout_boxes_assigns_ids_in_order() {
        let detections = vec![
            RawDetection {
                label: BoxLabel::Title,
                bbox: [0.0, 0.0, 100.0, 40.0],
                score: 0.95,
            },
            RawDetection {
                label: BoxLabel::Text,
                bbox: [0.0, 50.0, 100.0, 200.0],
                score: 0.9,
            },
        ];
        let boxes = to_layout_boxes(2, &detections);
        assert_eq!(boxes[0].id, "det_2_000");
        assert_eq!(boxes[1].id, "det_2_001");
        assert_eq!(boxes[0].page_index, Some(2));
    }

    #[test]
    fn test_to_layout_boxes_discards_degenerate() {
        let detections = vec![
            RawDetection {
                label: BoxLabel::Text,
                bbox: [100.0, 100.0, 100.0, 200.0],
                score: 0.9,
            },
            RawDetection {
                label: BoxLabel::Text,
                bbox: [0.0, 0.0, 50.0, 50.0],
                score: 0.9,
            },
        ];
        let boxes = to_layout_boxes(0, &detections);
        assert_eq!(boxes.len(), 1);
        // Index 1 keeps its detector-order ID even after index 0 is dropped
        assert_eq!(boxes[0].id, "det_0_001");
    }

    #[test]
    fn test_marketing_preset() {
        let cfg = IngestConfig::marketing(PathBuf::from("/tmp/cache"));
        assert_eq!(cfg.pipeline_name, "marketing");
        assert_eq!(cfg.order_policy, OrderPolicy::Hybrid);
        assert_eq!(cfg.detection_dpi, 400);
        assert_eq!(cfg.box_padding, 5.0);
    }

    #[test]
    fn test_fill_textual_block_failure_sentinel() {
        let mut block = Block {
            id: "det_0_000".to_string(),
            page_index: 0,
            role: BlockRole::Text,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap(),
            text: None,
            image_path: None,
            metadata: BTreeMap::new(),
        };
        let extraction = TextExtraction {
            text: String::new(),
            status: ExtractionStatus::Failed,
            error: Some("boom".to_string()),
        };
        fill_textual_block(&mut block, Some(&extraction), &TextPipeline::standard());
        assert_eq!(block.text.as_deref(), Some("[TEXT EXTRACTION FAILED - TEXT]"));
        assert_eq!(block.metadata["extraction_status"], "failed");
        assert_eq!(block.metadata["extraction_error"], "boom");
    }

    #[test]
    fn test_fill_textual_block_runs_pipeline() {
        let mut block = Block {
            id: "det_0_000".to_string(),
            page_index: 0,
            role: BlockRole::Text,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap(),
            text: None,
            image_path: None,
            metadata: BTreeMap::new(),
        };
        let extraction = TextExtraction {
            text: "the in\u{FB02}uenza vaccine".to_string(),
            status: ExtractionStatus::Ok,
            error: None,
        };
        fill_textual_block(&mut block, Some(&extraction), &TextPipeline::standard());
        assert_eq!(block.text.as_deref(), Some("the influenza vaccine"));
        assert_eq!(block.metadata["processors"][0], "artifact_cleanup");
    }
}
