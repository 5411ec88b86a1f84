//! Uniform box expansion with page-bound clamping.

use solstice_core::LayoutBox;

/// Expand each box by `padding` pixels in all four directions.
///
/// When page bounds are given, the expanded box is clamped to
/// `[0, page_w] × [0, page_h]`. If clamping would reduce a dimension below
/// 50% of the original (or below 1 px), the box is shifted inward to
/// preserve that minimum, so strictly positive dimensions are guaranteed.
///
/// Expanded boxes keep their IDs and record an `"expanded"` reason token.
#[must_use = "returns the expanded boxes"]
pub fn expand_boxes(
    boxes: Vec<LayoutBox>,
    padding: f32,
    page_w: Option<f32>,
    page_h: Option<f32>,
) -> Vec<LayoutBox> {
    if padding <= 0.0 {
        return boxes;
    }

    boxes
        .into_iter()
        .map(|mut b| {
            let orig_w = b.bbox.width();
            let orig_h = b.bbox.height();

            let mut x1 = b.bbox.x1 - padding;
            let mut y1 = b.bbox.y1 - padding;
            let mut x2 = b.bbox.x2 + padding;
            let mut y2 = b.bbox.y2 + padding;

            if let Some(w) = page_w {
                (x1, x2) = clamp_axis(x1, x2, w, min_dim(orig_w));
            }
            if let Some(h) = page_h {
                (y1, y2) = clamp_axis(y1, y2, h, min_dim(orig_h));
            }

            b.bbox.x1 = x1;
            b.bbox.y1 = y1;
            b.bbox.x2 = x2;
            b.bbox.y2 = y2;
            b.push_reason("expanded");
            b
        })
        .collect()
}

/// Minimum allowed dimension after clamping: half the original, at least 1 px.
#[inline]
fn min_dim(original: f32) -> f32 {
    (original * 0.5).max(1.0)
}

/// Clamp an axis range to `[0, bound]`, shifting inward when the clamped
/// extent falls below `min_extent`.
fn clamp_axis(lo: f32, hi: f32, bound: f32, min_extent: f32) -> (f32, f32) {
    let mut lo = lo.max(0.0);
    let mut hi = hi.min(bound);

    if hi - lo < min_extent {
        // Shift inward from whichever edge was clamped
        if lo <= 0.0 {
            hi = (lo + min_extent).min(bound);
        } else {
            lo = (hi - min_extent).max(0.0);
        }
    }

    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstice_core::{BoundingBox, BoxLabel};

    fn make(x1: f32, y1: f32, x2: f32, y2: f32) -> LayoutBox {
        LayoutBox::detection(
            0,
            0,
            BoundingBox::new(x1, y1, x2, y2).unwrap(),
            BoxLabel::Text,
            0.9,
        )
    }

    #[test]
    fn test_expand_unbounded() {
        let out = expand_boxes(vec![make(100.0, 100.0, 200.0, 150.0)], 5.0, None, None);
        let b = &out[0].bbox;
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (95.0, 95.0, 205.0, 155.0));
        assert_eq!(out[0].merge_reason.as_deref(), Some("expanded"));
        assert_eq!(out[0].id, "det_0_000");
    }

    #[test]
    fn test_expand_clamps_to_page() {
        let out = expand_boxes(
            vec![make(2.0, 2.0, 100.0, 100.0)],
            5.0,
            Some(500.0),
            Some(500.0),
        );
        let b = &out[0].bbox;
        assert_eq!((b.x1, b.y1), (0.0, 0.0));
        assert_eq!((b.x2, b.y2), (105.0, 105.0));
    }

    #[test]
    fn test_expand_preserves_minimum_extent() {
        // Box hugging the right edge of a narrow page: clamping alone would
        // collapse it, so it shifts inward to keep half the original width.
        let out = expand_boxes(vec![make(96.0, 10.0, 100.0, 20.0)], 50.0, Some(100.0), None);
        let b = &out[0].bbox;
        assert!(b.x2 - b.x1 >= 2.0);
        assert!(b.x1 < b.x2 && b.y1 < b.y2);
        assert!(b.x2 <= 100.0);
    }

    #[test]
    fn test_zero_padding_is_identity() {
        let input = vec![make(10.0, 10.0, 20.0, 20.0)];
        let out = expand_boxes(input.clone(), 0.0, Some(100.0), Some(100.0));
        assert_eq!(out, input);
    }
}
