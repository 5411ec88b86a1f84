//! Two-column + footer reading order.

use solstice_core::LayoutBox;

/// Pixel margin around the page midpoint used for column assignment.
const COLUMN_MARGIN: f32 = 50.0;

/// Width fraction at which an element counts as full-width.
const FULL_WIDTH_FRACTION: f32 = 0.75;

/// Page-height fraction below which full-width elements go to the footer
/// bucket (footnotes, page numbers).
const FOOTER_TOP_FRACTION: f32 = 0.80;

/// Order a page's boxes: left column top-down, right column top-down, then
/// bottom-of-page full-width elements.
///
/// A box is "left" when its right edge ends before `midpoint − 50 px`,
/// "right" when its left edge starts after `midpoint + 50 px`, otherwise it
/// is assigned by its horizontal center. Full-width boxes (≥ 75% of page
/// width) whose top edge sits in the bottom 20% of the page are pulled into
/// a separate footer bucket appended last.
#[must_use = "returns the ordered block IDs"]
pub fn simple_order(boxes: &[LayoutBox], page_w: f32, page_h: f32) -> Vec<String> {
    let midpoint = page_w / 2.0;

    let mut left: Vec<&LayoutBox> = Vec::new();
    let mut right: Vec<&LayoutBox> = Vec::new();
    let mut bottom: Vec<&LayoutBox> = Vec::new();

    for b in boxes {
        let full_width = b.bbox.width() >= FULL_WIDTH_FRACTION * page_w;
        if full_width && b.bbox.y1 >= FOOTER_TOP_FRACTION * page_h {
            bottom.push(b);
        } else if b.bbox.x2 < midpoint - COLUMN_MARGIN {
            left.push(b);
        } else if b.bbox.x1 > midpoint + COLUMN_MARGIN {
            right.push(b);
        } else if b.bbox.center().0 < midpoint {
            left.push(b);
        } else {
            right.push(b);
        }
    }

    for bucket in [&mut left, &mut right, &mut bottom] {
        bucket.sort_by(|a, b| {
            a.bbox
                .y1
                .total_cmp(&b.bbox.y1)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    left.iter()
        .chain(right.iter())
        .chain(bottom.iter())
        .map(|b| b.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstice_core::{BoundingBox, BoxLabel};

    fn make(idx: usize, x1: f32, y1: f32, x2: f32, y2: f32) -> LayoutBox {
        LayoutBox::detection(
            0,
            idx,
            BoundingBox::new(x1, y1, x2, y2).unwrap(),
            BoxLabel::Text,
            0.9,
        )
    }

    #[test]
    fn test_two_columns_with_footer() {
        // Scenario S3: left column first, then right, then the footer.
        let boxes = vec![
            make(0, 80.0, 100.0, 700.0, 800.0),
            make(1, 80.0, 820.0, 700.0, 1400.0),
            make(2, 900.0, 100.0, 1500.0, 800.0),
            make(3, 900.0, 820.0, 1500.0, 1400.0),
            make(4, 80.0, 2400.0, 1500.0, 2500.0),
        ];
        let order = simple_order(&boxes, 1600.0, 3000.0);
        assert_eq!(
            order,
            vec!["det_0_000", "det_0_001", "det_0_002", "det_0_003", "det_0_004"]
        );
    }

    #[test]
    fn test_straddling_box_assigned_by_center() {
        // Box crossing the midpoint with its center on the right
        let boxes = vec![
            make(0, 100.0, 100.0, 400.0, 200.0),
            make(1, 700.0, 100.0, 1400.0, 200.0),
        ];
        let order = simple_order(&boxes, 1600.0, 2000.0);
        assert_eq!(order, vec!["det_0_000", "det_0_001"]);
    }

    #[test]
    fn test_full_width_header_not_in_footer_bucket() {
        // Full-width but near the top: ordered with its column, not last.
        let boxes = vec![
            make(0, 50.0, 50.0, 1540.0, 150.0),
            make(1, 80.0, 200.0, 700.0, 400.0),
        ];
        let order = simple_order(&boxes, 1600.0, 2000.0);
        assert_eq!(order, vec!["det_0_000", "det_0_001"]);
    }

    #[test]
    fn test_equal_y_ties_break_on_id() {
        let boxes = vec![
            make(1, 80.0, 100.0, 300.0, 200.0),
            make(0, 80.0, 100.0, 300.0, 200.0),
        ];
        let order = simple_order(&boxes, 1600.0, 2000.0);
        assert_eq!(order, vec!["det_0_000", "det_0_001"]);
    }
}
