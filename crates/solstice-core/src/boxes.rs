//! Detection boxes and their labels.
//!
//! A [`LayoutBox`] is the unit the overlap resolver and reading-order
//! engines operate on: geometry, a detector label, a confidence score, and
//! lineage for every transformation applied since detection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::BoundingBox;

/// Label attached to a detection box.
///
/// The canonical set (`Text`, `Title`, `List`, `Table`, `Figure`) is what
/// downstream components consume; the remaining variants are produced by
/// specific detector checkpoints and are mapped to canonical roles when
/// blocks are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxLabel {
    /// Body text
    Text,
    /// Document or section title
    Title,
    /// List container
    List,
    /// Table region
    Table,
    /// Figure, chart, or image region
    Figure,
    /// Caption under a figure or table
    Caption,
    /// Footnote text
    Footnote,
    /// Mathematical formula
    Formula,
    /// Repeating page header
    PageHeader,
    /// Repeating page footer
    PageFooter,
    /// Section heading
    SectionHeader,
    /// Single list item
    ListItem,
    /// Paragraph (detector-specific alias of `Text`)
    Paragraph,
}

impl BoxLabel {
    /// Whether this label carries extractable text.
    #[inline]
    #[must_use = "returns whether the label is textual"]
    pub const fn is_textual(&self) -> bool {
        !matches!(self, Self::Table | Self::Figure)
    }

    /// Whether this label is rendered as an image crop.
    #[inline]
    #[must_use = "returns whether the label is graphical"]
    pub const fn is_graphical(&self) -> bool {
        matches!(self, Self::Table | Self::Figure)
    }

    /// Whether this label belongs to the text/paragraph family used by the
    /// near-duplicate merge rule.
    #[inline]
    #[must_use = "returns whether the label is a plain-text variant"]
    pub const fn is_plain_text(&self) -> bool {
        matches!(self, Self::Text | Self::Paragraph)
    }

    /// Whether this label belongs to the list family.
    #[inline]
    #[must_use = "returns whether the label is a list variant"]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List | Self::ListItem)
    }
}

impl fmt::Display for BoxLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "Text",
            Self::Title => "Title",
            Self::List => "List",
            Self::Table => "Table",
            Self::Figure => "Figure",
            Self::Caption => "Caption",
            Self::Footnote => "Footnote",
            Self::Formula => "Formula",
            Self::PageHeader => "PageHeader",
            Self::PageFooter => "PageFooter",
            Self::SectionHeader => "SectionHeader",
            Self::ListItem => "ListItem",
            Self::Paragraph => "Paragraph",
        };
        write!(f, "{s}")
    }
}

/// Detection artifact with geometry, label, score, and lineage.
///
/// Boxes are passed through the pipeline by value; any transformation that
/// alters geometry appends a reason token to `merge_reason` so the final
/// block metadata records how its bbox came to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Stable box identifier (`det_<page>_<NNN>` or `mrg_<primary>`)
    pub id: String,
    /// Box geometry in page-raster pixels
    pub bbox: BoundingBox,
    /// Detector label
    pub label: BoxLabel,
    /// Detection confidence in `[0, 1]`
    pub score: f32,
    /// Page this box belongs to (0-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,
    /// IDs of the boxes merged into this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,
    /// Comma-joined reason tokens for geometry changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_reason: Option<String>,
}

impl LayoutBox {
    /// Create a box with a detection ID in `det_<page>_<NNN>` format.
    #[must_use = "returns the constructed detection box"]
    pub fn detection(
        page_index: usize,
        detection_index: usize,
        bbox: BoundingBox,
        label: BoxLabel,
        score: f32,
    ) -> Self {
        Self {
            id: detection_id(page_index, detection_index),
            bbox,
            label,
            score,
            page_index: Some(page_index),
            source_ids: Vec::new(),
            merge_reason: None,
        }
    }

    /// Append a transformation reason token (comma-joined).
    pub fn push_reason(&mut self, reason: &str) {
        match &mut self.merge_reason {
            Some(existing) => {
                existing.push(',');
                existing.push_str(reason);
            }
            None => self.merge_reason = Some(reason.to_string()),
        }
    }
}

/// Format a detection ID: `det_<page>_<NNN>` with a zero-padded index.
#[inline]
#[must_use = "returns the formatted detection ID"]
pub fn detection_id(page_index: usize, detection_index: usize) -> String {
    format!("det_{page_index}_{detection_index:03}")
}

/// Format a merged-box ID from its primary (highest-scoring) source.
#[inline]
#[must_use = "returns the formatted merge ID"]
pub fn merge_id(primary_source_id: &str) -> String {
    format!("mrg_{primary_source_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_id_format() {
        assert_eq!(detection_id(0, 0), "det_0_000");
        assert_eq!(detection_id(3, 42), "det_3_042");
        assert_eq!(detection_id(12, 999), "det_12_999");
    }

    #[test]
    fn test_merge_id_format() {
        assert_eq!(merge_id("det_0_001"), "mrg_det_0_001");
    }

    #[test]
    fn test_push_reason_joins() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let mut b = LayoutBox::detection(0, 0, bbox, BoxLabel::Text, 0.9);
        assert_eq!(b.merge_reason, None);
        b.push_reason("expanded");
        b.push_reason("shrunk_x");
        assert_eq!(b.merge_reason.as_deref(), Some("expanded,shrunk_x"));
    }

    #[test]
    fn test_label_families() {
        assert!(BoxLabel::Paragraph.is_plain_text());
        assert!(BoxLabel::ListItem.is_list());
        assert!(BoxLabel::Figure.is_graphical());
        assert!(!BoxLabel::Figure.is_textual());
        assert!(BoxLabel::Caption.is_textual());
    }
}
