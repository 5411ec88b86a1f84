//! Layout detector adapter.
//!
//! A [`LayoutDetector`] maps page rasters to labeled, scored boxes. One
//! production implementation runs a pretrained object-detection model
//! through ONNX Runtime; a [`MockDetector`] replays fixed detections for
//! deterministic tests and offline runs. Label maps translate the model's
//! class indices into [`BoxLabel`]s at this boundary so everything
//! downstream sees the canonical label set.

mod mock;
mod onnx;

pub use mock::MockDetector;
pub use onnx::OnnxLayoutDetector;

use serde::{Deserialize, Serialize};
use solstice_core::BoxLabel;
use std::path::PathBuf;

use crate::error::Result;
use crate::page::PageImage;

/// One raw detection before conversion to a [`solstice_core::LayoutBox`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Mapped label
    pub label: BoxLabel,
    /// `(x1, y1, x2, y2)` in page-raster pixels
    pub bbox: [f32; 4],
    /// Model confidence in `[0, 1]`
    pub score: f32,
}

/// Detector interface: page rasters in, per-page detections out.
///
/// Implementations must be deterministic for the same input and parameters
/// within a process.
pub trait LayoutDetector: Send + Sync {
    /// Run detection over a batch of pages.
    ///
    /// Returns one `Vec<RawDetection>` per input page, in detector output
    /// order (that order fixes the `det_<page>_<NNN>` IDs downstream).
    ///
    /// # Errors
    ///
    /// Returns an error if the model fails to run.
    fn detect(&self, pages: &[PageImage]) -> Result<Vec<Vec<RawDetection>>>;

    /// Human-readable detector name recorded in pipeline metadata.
    fn name(&self) -> &str;
}

/// Which checkpoint's class list the model emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelMap {
    /// Academic checkpoint: `Text, Title, List, Table, Figure`
    #[default]
    Academic,
    /// Marketing checkpoint: region classes remapped onto the canonical set
    Marketing,
}

impl LabelMap {
    /// Map a model class index to a label, or `None` for classes the
    /// pipeline discards (separators, math regions without content).
    #[must_use = "returns the mapped label"]
    pub fn label_for_class(&self, class_index: usize) -> Option<BoxLabel> {
        match self {
            Self::Academic => match class_index {
                0 => Some(BoxLabel::Text),
                1 => Some(BoxLabel::Title),
                2 => Some(BoxLabel::List),
                3 => Some(BoxLabel::Table),
                4 => Some(BoxLabel::Figure),
                _ => None,
            },
            Self::Marketing => match class_index {
                // TextRegion, ImageRegion, TableRegion, MathsRegion,
                // SeparatorRegion, OtherRegion
                0 => Some(BoxLabel::Text),
                1 => Some(BoxLabel::Figure),
                2 => Some(BoxLabel::Table),
                3 => Some(BoxLabel::Formula),
                4 | 5 => None,
                _ => None,
            },
        }
    }
}

impl std::str::FromStr for LabelMap {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "academic" => Ok(Self::Academic),
            "marketing" => Ok(Self::Marketing),
            _ => Err(format!(
                "unknown label map '{s}' (expected: academic, marketing)"
            )),
        }
    }
}

/// Detector model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Minimum score for a detection to survive
    pub score_threshold: f32,
    /// IoU threshold for non-maximum suppression
    pub nms_threshold: f32,
    /// Class list the checkpoint emits
    pub label_map: LabelMap,
}

impl DetectorConfig {
    /// Defaults matching the published checkpoint.
    #[must_use = "returns the detector configuration"]
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            score_threshold: 0.5,
            nms_threshold: 0.45,
            label_map: LabelMap::Academic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_label_map() {
        assert_eq!(LabelMap::Academic.label_for_class(0), Some(BoxLabel::Text));
        assert_eq!(LabelMap::Academic.label_for_class(4), Some(BoxLabel::Figure));
        assert_eq!(LabelMap::Academic.label_for_class(9), None);
    }

    #[test]
    fn test_marketing_label_map_discards_separators() {
        assert_eq!(LabelMap::Marketing.label_for_class(1), Some(BoxLabel::Figure));
        assert_eq!(LabelMap::Marketing.label_for_class(4), None);
        assert_eq!(LabelMap::Marketing.label_for_class(5), None);
    }

    #[test]
    fn test_label_map_from_str() {
        assert_eq!("academic".parse::<LabelMap>().unwrap(), LabelMap::Academic);
        assert_eq!("Marketing".parse::<LabelMap>().unwrap(), LabelMap::Marketing);
        assert!("other".parse::<LabelMap>().is_err());
    }
}
