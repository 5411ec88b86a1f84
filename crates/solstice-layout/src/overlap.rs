//! Overlap diagnostics and box priority weights.

use solstice_core::{BoundingBox, LayoutBox};

use crate::config::ResolverConfig;

/// Full overlap diagnostic for an ordered box pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapInfo {
    /// Whether the boxes overlap at all
    pub has_overlap: bool,
    /// Intersection area in px²
    pub overlap_area: f32,
    /// Intersection over the first box's area
    pub ratio_box1: f32,
    /// Intersection over the second box's area
    pub ratio_box2: f32,
    /// Intersection over union
    pub iou: f32,
    /// Intersection over the smaller area
    pub ios: f32,
    /// Either containment ratio exceeds the nested threshold
    pub is_nested: bool,
    /// Overlapping but not nested
    pub is_partial: bool,
}

impl OverlapInfo {
    /// Compute the diagnostic for a pair of boxes.
    #[must_use = "returns the computed overlap diagnostic"]
    pub fn compute(a: &BoundingBox, b: &BoundingBox, nested_threshold: f32) -> Self {
        let overlap_area = a.intersection_area(b);
        let has_overlap = overlap_area > 0.0;
        let ratio_box1 = if a.area() > 0.0 {
            overlap_area / a.area()
        } else {
            0.0
        };
        let ratio_box2 = if b.area() > 0.0 {
            overlap_area / b.area()
        } else {
            0.0
        };
        let is_nested = ratio_box1 > nested_threshold || ratio_box2 > nested_threshold;

        Self {
            has_overlap,
            overlap_area,
            ratio_box1,
            ratio_box2,
            iou: a.iou(b),
            ios: a.intersection_over_smaller(b),
            is_nested,
            is_partial: has_overlap && !is_nested,
        }
    }

    /// The larger of the two containment ratios.
    #[inline]
    #[must_use = "returns the maximum containment ratio"]
    pub fn max_ratio(&self) -> f32 {
        self.ratio_box1.max(self.ratio_box2)
    }

    /// The smaller of the two containment ratios.
    #[inline]
    #[must_use = "returns the minimum containment ratio"]
    pub fn min_ratio(&self) -> f32 {
        self.ratio_box1.min(self.ratio_box2)
    }
}

/// Priority weight of a box for conflict resolution.
///
/// `(score·wc + area_ratio·wa)·(1 + type_bonus)` where `area_ratio` is the
/// box area over the page area clamped to `[0, 1]` and `wc + wa` is
/// normalized to 1. The caller must supply positive `wc + wa`.
#[must_use = "returns the computed box weight"]
pub fn box_weight(b: &LayoutBox, page_w: f32, page_h: f32, cfg: &ResolverConfig) -> f32 {
    let sum = cfg.weight_score + cfg.weight_area;
    debug_assert!(sum > 0.0, "weight_score + weight_area must be positive");
    let wc = cfg.weight_score / sum;
    let wa = cfg.weight_area / sum;

    let page_area = page_w * page_h;
    let area_ratio = if page_area > 0.0 {
        (b.bbox.area() / page_area).clamp(0.0, 1.0)
    } else {
        0.0
    };

    (b.score * wc + area_ratio * wa) * (1.0 + cfg.type_bonus(b.label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstice_core::BoxLabel;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn test_disjoint_pair() {
        let info = OverlapInfo::compute(&bbox(0.0, 0.0, 10.0, 10.0), &bbox(20.0, 0.0, 30.0, 10.0), 0.95);
        assert!(!info.has_overlap);
        assert!(!info.is_partial);
        assert_eq!(info.overlap_area, 0.0);
    }

    #[test]
    fn test_nested_pair() {
        let outer = bbox(0.0, 0.0, 100.0, 100.0);
        let inner = bbox(10.0, 10.0, 30.0, 30.0);
        let info = OverlapInfo::compute(&outer, &inner, 0.95);
        assert!(info.is_nested);
        assert!(!info.is_partial);
        assert!((info.ratio_box2 - 1.0).abs() < 1e-6);
        assert!((info.ios - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_pair() {
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(50.0, 0.0, 150.0, 100.0);
        let info = OverlapInfo::compute(&a, &b, 0.95);
        assert!(info.is_partial);
        assert!((info.ratio_box1 - 0.5).abs() < 1e-6);
        assert!((info.iou - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_weight_prefers_score_and_bonus() {
        let cfg = ResolverConfig::clinical();
        let text = LayoutBox::detection(0, 0, bbox(0.0, 0.0, 100.0, 100.0), BoxLabel::Text, 0.5);
        let table = LayoutBox::detection(0, 1, bbox(0.0, 0.0, 100.0, 100.0), BoxLabel::Table, 0.5);
        let w_text = box_weight(&text, 1000.0, 1000.0, &cfg);
        let w_table = box_weight(&table, 1000.0, 1000.0, &cfg);
        assert!(w_table > w_text);

        let strong = LayoutBox::detection(0, 2, bbox(0.0, 0.0, 100.0, 100.0), BoxLabel::Text, 0.9);
        assert!(box_weight(&strong, 1000.0, 1000.0, &cfg) > w_text);
    }
}
