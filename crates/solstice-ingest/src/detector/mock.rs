//! Replay detector for tests and offline runs.

use super::{LayoutDetector, RawDetection};
use crate::error::{IngestError, Result};
use crate::page::PageImage;

/// A detector that replays pre-recorded detections.
///
/// Used by tests and by offline re-runs against persisted
/// `raw_layout_boxes.json`. Pages beyond the recorded list yield no
/// detections.
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
    per_page: Vec<Vec<RawDetection>>,
    strict: bool,
}

impl MockDetector {
    /// Replay the given per-page detections.
    #[must_use = "returns the constructed mock detector"]
    pub fn new(per_page: Vec<Vec<RawDetection>>) -> Self {
        Self {
            per_page,
            strict: false,
        }
    }

    /// Fail instead of returning empty pages when the batch is larger than
    /// the recorded list.
    #[must_use = "returns the strict mock detector"]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl LayoutDetector for MockDetector {
    fn detect(&self, pages: &[PageImage]) -> Result<Vec<Vec<RawDetection>>> {
        if self.strict && pages.len() > self.per_page.len() {
            return Err(IngestError::Detector(format!(
                "mock detector has {} pages recorded, {} requested",
                self.per_page.len(),
                pages.len()
            )));
        }
        Ok(pages
            .iter()
            .map(|p| self.per_page.get(p.page_index).cloned().unwrap_or_default())
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
