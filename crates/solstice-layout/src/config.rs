//! Resolver configuration and presets.

use solstice_core::BoxLabel;

/// Thresholds and weights for the overlap resolver.
///
/// The presets supply the threshold sets used by the two document families
/// this pipeline ingests, plus conservative/aggressive variants for tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Overlaps below this ratio on both boxes are preserved as-is (default 0.10)
    pub minor_overlap_threshold: f32,
    /// Same-label overlap ratio at which boxes are merged (default 0.85)
    pub same_type_merge_threshold: f32,
    /// Containment ratio at which a pair counts as nested (default 0.95)
    pub nested_threshold: f32,
    /// Minimum post-shrink box area in px²; smaller boxes are dropped (default 100)
    pub min_box_area: f32,
    /// IoU threshold for the transitive same-label merge pass (default 0.5)
    pub iou_merge_threshold: f32,
    /// Weight of the detection score in box priority (normalized with `weight_area`)
    pub weight_score: f32,
    /// Weight of the page-area ratio in box priority
    pub weight_area: f32,
}

impl Default for ResolverConfig {
    #[inline]
    fn default() -> Self {
        Self::clinical()
    }
}

impl ResolverConfig {
    /// Defaults tuned on clinical trial documents.
    #[must_use = "returns the clinical preset"]
    pub const fn clinical() -> Self {
        Self {
            minor_overlap_threshold: 0.10,
            same_type_merge_threshold: 0.85,
            nested_threshold: 0.95,
            min_box_area: 100.0,
            iou_merge_threshold: 0.5,
            weight_score: 0.7,
            weight_area: 0.3,
        }
    }

    /// Marketing material: denser art, merge a little earlier.
    #[must_use = "returns the marketing preset"]
    pub const fn marketing() -> Self {
        Self {
            minor_overlap_threshold: 0.10,
            same_type_merge_threshold: 0.80,
            nested_threshold: 0.95,
            min_box_area: 150.0,
            iou_merge_threshold: 0.4,
            weight_score: 0.6,
            weight_area: 0.4,
        }
    }

    /// Keep more boxes; only act on blatant overlaps.
    #[must_use = "returns the conservative preset"]
    pub const fn conservative() -> Self {
        Self {
            minor_overlap_threshold: 0.15,
            same_type_merge_threshold: 0.90,
            nested_threshold: 0.97,
            min_box_area: 50.0,
            iou_merge_threshold: 0.6,
            weight_score: 0.7,
            weight_area: 0.3,
        }
    }

    /// Consolidate hard; fewer, larger boxes.
    #[must_use = "returns the aggressive preset"]
    pub const fn aggressive() -> Self {
        Self {
            minor_overlap_threshold: 0.05,
            same_type_merge_threshold: 0.75,
            nested_threshold: 0.90,
            min_box_area: 200.0,
            iou_merge_threshold: 0.35,
            weight_score: 0.7,
            weight_area: 0.3,
        }
    }

    /// Resolve a preset by name.
    ///
    /// # Errors
    ///
    /// Returns the unknown name back so the caller can report it.
    pub fn preset(name: &str) -> Result<Self, String> {
        match name.to_lowercase().as_str() {
            "clinical" => Ok(Self::clinical()),
            "marketing" => Ok(Self::marketing()),
            "conservative" => Ok(Self::conservative()),
            "aggressive" => Ok(Self::aggressive()),
            _ => Err(format!(
                "unknown resolver preset '{name}' (expected: clinical, marketing, conservative, aggressive)"
            )),
        }
    }

    /// Label bonus applied multiplicatively to box weight.
    ///
    /// Tables and figures are detected with tight geometry and should win
    /// nested conflicts against the text fragments inside them.
    #[inline]
    #[must_use = "returns the label weight bonus"]
    pub fn type_bonus(&self, label: BoxLabel) -> f32 {
        match label {
            BoxLabel::Table => 0.20,
            BoxLabel::Figure => 0.15,
            BoxLabel::Title | BoxLabel::SectionHeader => 0.10,
            _ => 0.0,
        }
    }
}
