//! Persisted document model.
//!
//! A [`Document`] is the canonical output of ingestion: blocks with stable
//! IDs, a per-page reading order, and the metadata needed to reproduce the
//! run. The JSON round-trip is exact under canonical serialization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::bbox::BoundingBox;
use crate::boxes::BoxLabel;
use crate::error::{Result, SolsticeError};

/// Canonical role of a block after label mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockRole {
    /// Body text
    Text,
    /// Title or heading
    Title,
    /// List content
    List,
    /// Figure rendered as an image crop
    Figure,
    /// Table rendered as an image crop
    Table,
}

impl BlockRole {
    /// Whether blocks of this role carry an image crop instead of text.
    #[inline]
    #[must_use = "returns whether the role is graphical"]
    pub const fn is_graphical(&self) -> bool {
        matches!(self, Self::Figure | Self::Table)
    }

    /// Lowercase name used in figure filenames.
    #[inline]
    #[must_use = "returns the lowercase role name"]
    pub const fn as_lower(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Title => "title",
            Self::List => "list",
            Self::Figure => "figure",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for BlockRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "Text",
            Self::Title => "Title",
            Self::List => "List",
            Self::Figure => "Figure",
            Self::Table => "Table",
        };
        write!(f, "{s}")
    }
}

impl From<BoxLabel> for BlockRole {
    /// Collapse detector-specific labels onto the canonical role set.
    fn from(label: BoxLabel) -> Self {
        match label {
            BoxLabel::Title | BoxLabel::SectionHeader => Self::Title,
            BoxLabel::List | BoxLabel::ListItem => Self::List,
            BoxLabel::Table => Self::Table,
            BoxLabel::Figure => Self::Figure,
            BoxLabel::Text
            | BoxLabel::Paragraph
            | BoxLabel::Caption
            | BoxLabel::Footnote
            | BoxLabel::Formula
            | BoxLabel::PageHeader
            | BoxLabel::PageFooter => Self::Text,
        }
    }
}

/// A canonical unit of document content.
///
/// Exactly one of `text` (non-empty) or `image_path` is populated for
/// non-empty blocks; graphical roles always carry `image_path`, textual
/// roles always carry `text` (possibly the empty string, never absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable block identifier inherited from the resolved box
    pub id: String,
    /// Page the block belongs to (0-based)
    pub page_index: usize,
    /// Canonical role
    pub role: BlockRole,
    /// Geometry in page-raster pixels at detection DPI
    pub bbox: BoundingBox,
    /// Extracted (post-processed) text for textual roles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Relative path to the rendered crop for graphical roles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Free-form metadata: score, detection DPI, extraction status, processor tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Block {
    /// Insert a metadata entry, replacing any previous value.
    pub fn set_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Number of pages in the source PDF
    pub total_pages: usize,
    /// DPI the pages were rasterized at for detection
    pub detection_dpi: u32,
    /// Name of the pipeline that produced the document
    pub pipeline: String,
}

/// Counters recorded by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Boxes emitted by the detector before any consolidation
    pub raw_detection_count: usize,
    /// Boxes remaining after overlap resolution
    pub after_consolidation_count: usize,
    /// Blocks in the persisted document
    pub final_block_count: usize,
    /// Human-readable description of the ID scheme
    pub id_format: String,
}

impl PipelineMetadata {
    /// Standard description of the detection/merge ID scheme.
    #[must_use = "returns the ID format description"]
    pub fn standard_id_format() -> String {
        "det_<page>_<NNN> for detections, mrg_<primary> for merged boxes".to_string()
    }
}

/// Canonical block-addressable representation of an ingested PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier or path of the source PDF
    pub source_pdf: String,
    /// All blocks across all pages
    pub blocks: Vec<Block>,
    /// Per-page ordered block IDs; `reading_order[p]` covers page `p`
    pub reading_order: Vec<Vec<String>>,
    /// Document-level metadata
    pub metadata: DocumentMetadata,
    /// Pipeline counters
    pub pipeline_metadata: PipelineMetadata,
}

impl Document {
    /// Check the structural invariants of the document.
    ///
    /// - `reading_order` has exactly `total_pages` entries;
    /// - every ID in `reading_order[p]` names a block with `page_index == p`;
    /// - every block appears in its page's order exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`SolsticeError::InvalidDocument`] naming the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.reading_order.len() != self.metadata.total_pages {
            return Err(SolsticeError::InvalidDocument(format!(
                "reading_order has {} pages, metadata says {}",
                self.reading_order.len(),
                self.metadata.total_pages
            )));
        }

        let by_id: HashMap<&str, &Block> =
            self.blocks.iter().map(|b| (b.id.as_str(), b)).collect();
        if by_id.len() != self.blocks.len() {
            return Err(SolsticeError::InvalidDocument(
                "duplicate block IDs".to_string(),
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (page, order) in self.reading_order.iter().enumerate() {
            for id in order {
                let block = by_id.get(id.as_str()).ok_or_else(|| {
                    SolsticeError::InvalidDocument(format!(
                        "reading_order[{page}] references unknown block '{id}'"
                    ))
                })?;
                if block.page_index != page {
                    return Err(SolsticeError::InvalidDocument(format!(
                        "block '{id}' is on page {} but ordered on page {page}",
                        block.page_index
                    )));
                }
                if !seen.insert(id.as_str()) {
                    return Err(SolsticeError::InvalidDocument(format!(
                        "block '{id}' appears more than once in reading order"
                    )));
                }
            }
        }

        for block in &self.blocks {
            if !seen.contains(block.id.as_str()) {
                return Err(SolsticeError::InvalidDocument(format!(
                    "block '{}' missing from reading order of page {}",
                    block.id, block.page_index
                )));
            }
        }

        Ok(())
    }

    /// Blocks on a given page, in reading order.
    #[must_use = "returns the ordered blocks for the page"]
    pub fn page_blocks(&self, page_index: usize) -> Vec<&Block> {
        let by_id: HashMap<&str, &Block> =
            self.blocks.iter().map(|b| (b.id.as_str(), b)).collect();
        self.reading_order
            .get(page_index)
            .map(|order| {
                order
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up a block by ID.
    #[must_use = "returns the block if present"]
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0).unwrap();
        Document {
            source_pdf: "report.pdf".to_string(),
            blocks: vec![
                Block {
                    id: "det_0_000".to_string(),
                    page_index: 0,
                    role: BlockRole::Title,
                    bbox,
                    text: Some("Heading".to_string()),
                    image_path: None,
                    metadata: BTreeMap::new(),
                },
                Block {
                    id: "det_0_001".to_string(),
                    page_index: 0,
                    role: BlockRole::Text,
                    bbox,
                    text: Some("Body".to_string()),
                    image_path: None,
                    metadata: BTreeMap::new(),
                },
            ],
            reading_order: vec![vec!["det_0_000".to_string(), "det_0_001".to_string()]],
            metadata: DocumentMetadata {
                total_pages: 1,
                detection_dpi: 400,
                pipeline: "clinical".to_string(),
            },
            pipeline_metadata: PipelineMetadata {
                raw_detection_count: 2,
                after_consolidation_count: 2,
                final_block_count: 2,
                id_format: PipelineMetadata::standard_id_format(),
            },
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_document().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_id() {
        let mut doc = sample_document();
        doc.reading_order[0].push("det_0_999".to_string());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_page() {
        let mut doc = sample_document();
        doc.blocks[1].page_index = 1;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_in_order() {
        let mut doc = sample_document();
        doc.reading_order[0].push("det_0_000".to_string());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_block() {
        let mut doc = sample_document();
        doc.reading_order[0].pop();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_identity() {
        let doc = sample_document();
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        // Byte-exact under canonical serialization
        let json2 = serde_json::to_string_pretty(&back).unwrap();
        assert_eq!(json, json2);
    }

    #[test]
    fn test_role_mapping_collapses_variants() {
        assert_eq!(BlockRole::from(BoxLabel::SectionHeader), BlockRole::Title);
        assert_eq!(BlockRole::from(BoxLabel::ListItem), BlockRole::List);
        assert_eq!(BlockRole::from(BoxLabel::Caption), BlockRole::Text);
        assert_eq!(BlockRole::from(BoxLabel::Figure), BlockRole::Figure);
    }
}
