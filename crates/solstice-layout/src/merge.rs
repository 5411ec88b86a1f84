//! Same-label merge pass.
//!
//! Groups boxes by label and merges duplicates within each group. The
//! text/paragraph family uses a near-duplicate rule (mutual 85% coverage)
//! so adjacent columns never collapse into one block; every other label
//! merges transitively on IoU.

use log::debug;
use solstice_core::{merge_id, LayoutBox};
use std::collections::HashMap;

/// Coverage each box must have of the other for the near-duplicate rule.
const NEAR_DUPLICATE_COVERAGE: f32 = 0.85;

/// Union-Find over group-local indices with path compression.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx != ry {
            // Attach the larger root index under the smaller to keep the
            // earliest input as the component representative.
            if rx < ry {
                self.parent[ry] = rx;
            } else {
                self.parent[rx] = ry;
            }
        }
    }
}

/// Merge same-label boxes.
///
/// Text/Paragraph boxes merge only when the intersection covers at least
/// 85% of the area of **both** boxes; all other labels merge transitively
/// when pairwise `IoU > iou_threshold`.
///
/// The merged box carries the union bbox, the highest input score, the ID
/// `mrg_<primary>` (primary = highest-scoring input, first on ties), and
/// `source_ids` listing every input in original order. Output preserves the
/// input order of each surviving representative.
#[must_use = "returns the merged boxes"]
pub fn merge_same_label(boxes: Vec<LayoutBox>, iou_threshold: f32) -> Vec<LayoutBox> {
    // Group indices by exact label, preserving input order
    let mut groups: HashMap<_, Vec<usize>> = HashMap::new();
    for (i, b) in boxes.iter().enumerate() {
        groups.entry(b.label).or_default().push(i);
    }

    // Map each input index to its component representative (input index)
    let mut representative: Vec<usize> = (0..boxes.len()).collect();
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();

    for indices in groups.values() {
        let mut uf = UnionFind::new(indices.len());
        for (gi, &i) in indices.iter().enumerate() {
            for (gj, &j) in indices.iter().enumerate().skip(gi + 1) {
                if should_merge(&boxes[i], &boxes[j], iou_threshold) {
                    uf.union(gi, gj);
                }
            }
        }
        for (gi, &i) in indices.iter().enumerate() {
            let root = uf.find(gi);
            representative[i] = indices[root];
            members.entry(indices[root]).or_default().push(i);
        }
    }

    let mut out = Vec::with_capacity(boxes.len());
    for (i, b) in boxes.iter().enumerate() {
        if representative[i] != i {
            continue;
        }
        let component = members.get(&i).cloned().unwrap_or_else(|| vec![i]);
        if component.len() == 1 {
            out.push(b.clone());
        } else {
            out.push(merge_component(&boxes, &component));
        }
    }
    out
}

/// Pairwise merge test within a label group.
fn should_merge(a: &LayoutBox, b: &LayoutBox, iou_threshold: f32) -> bool {
    if a.label.is_plain_text() {
        // Near-duplicate rule: the intersection must cover most of BOTH
        // boxes, otherwise side-by-side columns would collapse.
        let intersection = a.bbox.intersection_area(&b.bbox);
        intersection >= NEAR_DUPLICATE_COVERAGE * a.bbox.area()
            && intersection >= NEAR_DUPLICATE_COVERAGE * b.bbox.area()
    } else {
        a.bbox.iou(&b.bbox) > iou_threshold
    }
}

/// Build the merged box for a component of ≥ 2 inputs.
fn merge_component(boxes: &[LayoutBox], component: &[usize]) -> LayoutBox {
    let primary = component
        .iter()
        .copied()
        .max_by(|&a, &b| {
            boxes[a]
                .score
                .partial_cmp(&boxes[b].score)
                .unwrap_or(std::cmp::Ordering::Equal)
                // On equal scores prefer the earlier input
                .then(b.cmp(&a))
        })
        .unwrap_or(component[0]);

    let mut bbox = boxes[component[0]].bbox;
    let mut score = boxes[component[0]].score;
    for &i in &component[1..] {
        bbox = bbox.union(&boxes[i].bbox);
        score = score.max(boxes[i].score);
    }

    let source_ids: Vec<String> = component.iter().map(|&i| boxes[i].id.clone()).collect();
    debug!(
        "merging {} {} boxes into {}",
        component.len(),
        boxes[primary].label,
        merge_id(&boxes[primary].id)
    );

    let mut merged = LayoutBox {
        id: merge_id(&boxes[primary].id),
        bbox,
        label: boxes[primary].label,
        score,
        page_index: boxes[primary].page_index,
        source_ids,
        merge_reason: None,
    };
    merged.push_reason("merged");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstice_core::{BoundingBox, BoxLabel};

    fn make(idx: usize, x1: f32, y1: f32, x2: f32, y2: f32, label: BoxLabel, score: f32) -> LayoutBox {
        LayoutBox::detection(
            0,
            idx,
            BoundingBox::new(x1, y1, x2, y2).unwrap(),
            label,
            score,
        )
    }

    #[test]
    fn test_near_duplicate_text_merges() {
        // Scenario S1: two near-identical Text boxes become one merged box
        let a = make(0, 100.0, 100.0, 300.0, 200.0, BoxLabel::Text, 0.9);
        let b = make(1, 110.0, 105.0, 305.0, 205.0, BoxLabel::Text, 0.7);
        let out = merge_same_label(vec![a, b], 0.5);
        assert_eq!(out.len(), 1);
        let m = &out[0];
        assert_eq!(m.id, "mrg_det_0_000");
        assert_eq!(
            (m.bbox.x1, m.bbox.y1, m.bbox.x2, m.bbox.y2),
            (100.0, 100.0, 305.0, 205.0)
        );
        assert_eq!(m.score, 0.9);
        assert_eq!(m.source_ids, vec!["det_0_000", "det_0_001"]);
    }

    #[test]
    fn test_columns_do_not_collapse() {
        // Two side-by-side text columns with a thin overlap: near-duplicate
        // rule keeps them apart even though IoU is nonzero.
        let left = make(0, 0.0, 0.0, 400.0, 800.0, BoxLabel::Text, 0.9);
        let right = make(1, 390.0, 0.0, 800.0, 800.0, BoxLabel::Text, 0.9);
        let out = merge_same_label(vec![left, right], 0.01);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_transitive_iou_merge_for_tables() {
        // a↔b and b↔c overlap above the threshold; a↔c barely touch. All
        // three still join one component transitively.
        let a = make(0, 0.0, 0.0, 100.0, 100.0, BoxLabel::Table, 0.6);
        let b = make(1, 40.0, 0.0, 140.0, 100.0, BoxLabel::Table, 0.8);
        let c = make(2, 80.0, 0.0, 180.0, 100.0, BoxLabel::Table, 0.7);
        let out = merge_same_label(vec![a, b, c], 0.3);
        assert_eq!(out.len(), 1);
        let m = &out[0];
        // Primary is the highest-scoring input, not the first
        assert_eq!(m.id, "mrg_det_0_001");
        assert_eq!(m.source_ids.len(), 3);
        assert_eq!(m.bbox.x2, 180.0);
    }

    #[test]
    fn test_different_labels_never_merge() {
        let a = make(0, 0.0, 0.0, 100.0, 100.0, BoxLabel::Table, 0.6);
        let b = make(1, 0.0, 0.0, 100.0, 100.0, BoxLabel::Figure, 0.8);
        let out = merge_same_label(vec![a, b], 0.3);
        assert_eq!(out.len(), 2);
    }
}
