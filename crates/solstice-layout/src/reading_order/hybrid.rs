//! Hybrid reading order: column detection + DAG topological sort.

use log::trace;
use solstice_core::LayoutBox;
use std::collections::BTreeMap;

/// Silhouette score below which the two-cluster split is rejected.
const MIN_SILHOUETTE: f32 = 0.25;

/// Cluster-center spread (fraction of page width) below which the split is
/// rejected.
const MIN_CENTER_SPREAD: f32 = 0.15;

/// Width fraction at which a box spans both columns.
const SPAN_FRACTION: f32 = 0.60;

/// Maximum k-means refinement iterations; centers converge in a handful.
const KMEANS_ITERATIONS: usize = 50;

/// Order a page's boxes with 1-vs-2 column detection and a precedence DAG.
///
/// Horizontal centers are clustered with 1-D k-means (k = 2, deterministic
/// seeds at the min and max center). If the approximate silhouette is below
/// 0.25 or the centers sit closer than 15% of the page width, the page is
/// treated as single-column. Edges `i → j` are added when:
///
/// - `i` ends above `j` and they overlap horizontally;
/// - `i` is in an earlier column than `j` and they overlap horizontally;
/// - `i` spans both columns and starts no later than `j`.
///
/// The DAG is ordered with Kahn's algorithm; if a cycle sneaks in, the
/// fallback is a plain top-y sort. Either way the result is a total order.
#[must_use = "returns the ordered block IDs"]
pub fn hybrid_order(boxes: &[LayoutBox], page_w: f32, _page_h: f32) -> Vec<String> {
    if boxes.is_empty() {
        return Vec::new();
    }
    if boxes.len() == 1 {
        return vec![boxes[0].id.clone()];
    }

    let centers: Vec<f32> = boxes.iter().map(|b| b.bbox.center().0).collect();
    let labels = column_labels(&centers, page_w);
    let spans: Vec<bool> = boxes
        .iter()
        .map(|b| b.bbox.width() >= SPAN_FRACTION * page_w)
        .collect();

    // Precedence DAG. BTreeMap keeps iteration deterministic.
    let n = boxes.len();
    let mut successors: BTreeMap<usize, Vec<usize>> = (0..n).map(|i| (i, Vec::new())).collect();
    let mut indegree = vec![0usize; n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let a = &boxes[i];
            let b = &boxes[j];

            let above = a.bbox.y2 <= b.bbox.y1 && a.bbox.overlaps_horizontally(&b.bbox);
            let earlier_column =
                labels[i] < labels[j] && a.bbox.overlaps_horizontally(&b.bbox);
            // Spanning boxes bridge columns; strict start (ID tie-break)
            // keeps two co-located spans from forming a cycle.
            let span_before = spans[i]
                && (a.bbox.y1 < b.bbox.y1 || (a.bbox.y1 == b.bbox.y1 && a.id < b.id));

            if above || earlier_column || span_before {
                if let Some(succ) = successors.get_mut(&i) {
                    if !succ.contains(&j) {
                        succ.push(j);
                        indegree[j] += 1;
                    }
                }
            }
        }
    }

    match kahn_sort(boxes, &labels, &successors, indegree) {
        Some(order) => order,
        None => {
            trace!("reading-order DAG has a cycle, falling back to top-y sort");
            top_y_fallback(boxes)
        }
    }
}

/// Assign column labels (0 = left, 1 = right) or all-zero for one column.
fn column_labels(centers: &[f32], page_w: f32) -> Vec<usize> {
    let (assignment, cluster_centers) = kmeans_two(centers);

    let spread = (cluster_centers[0] - cluster_centers[1]).abs();
    if spread < MIN_CENTER_SPREAD * page_w {
        return vec![0; centers.len()];
    }
    if silhouette(centers, &assignment) < MIN_SILHOUETTE {
        return vec![0; centers.len()];
    }

    // Label 0 must be the left cluster
    if cluster_centers[0] <= cluster_centers[1] {
        assignment
    } else {
        assignment.iter().map(|&l| 1 - l).collect()
    }
}

/// Deterministic 1-D k-means with k = 2, seeded at the min and max values.
fn kmeans_two(values: &[f32]) -> (Vec<usize>, [f32; 2]) {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut centers = [min, max];

    if (max - min).abs() < f32::EPSILON {
        return (vec![0; values.len()], centers);
    }

    let mut assignment = vec![0usize; values.len()];
    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (i, &v) in values.iter().enumerate() {
            let label = usize::from((v - centers[1]).abs() < (v - centers[0]).abs());
            if assignment[i] != label {
                assignment[i] = label;
                changed = true;
            }
        }

        for cluster in 0..2 {
            let members: Vec<f32> = values
                .iter()
                .zip(&assignment)
                .filter(|(_, &l)| l == cluster)
                .map(|(&v, _)| v)
                .collect();
            if !members.is_empty() {
                centers[cluster] = members.iter().sum::<f32>() / members.len() as f32;
            }
        }

        if !changed {
            break;
        }
    }

    (assignment, centers)
}

/// Approximate silhouette score over the two clusters.
///
/// For each point: `a` is the mean distance to its own cluster (excluding
/// itself), `b` the mean distance to the other cluster; the score is the
/// mean of `(b − a) / max(a, b)`. Degenerate clusters score 0.
fn silhouette(values: &[f32], assignment: &[usize]) -> f32 {
    let mut total = 0.0;
    let mut count = 0usize;

    for (i, &v) in values.iter().enumerate() {
        let own: Vec<f32> = values
            .iter()
            .zip(assignment)
            .enumerate()
            .filter(|(k, (_, &l))| *k != i && l == assignment[i])
            .map(|(_, (&x, _))| (x - v).abs())
            .collect();
        let other: Vec<f32> = values
            .iter()
            .zip(assignment)
            .filter(|(_, &l)| l != assignment[i])
            .map(|(&x, _)| (x - v).abs())
            .collect();

        if other.is_empty() {
            return 0.0;
        }
        let a = if own.is_empty() {
            0.0
        } else {
            own.iter().sum::<f32>() / own.len() as f32
        };
        let b = other.iter().sum::<f32>() / other.len() as f32;
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        total / count as f32
    }
}

/// Kahn's algorithm with a deterministic ready queue: earlier column first,
/// then top-y, then left-x, then ID. Returns `None` when a cycle prevents a
/// complete order.
fn kahn_sort(
    boxes: &[LayoutBox],
    labels: &[usize],
    successors: &BTreeMap<usize, Vec<usize>>,
    mut indegree: Vec<usize>,
) -> Option<Vec<String>> {
    let n = boxes.len();
    let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while !ready.is_empty() {
        ready.sort_by(|&a, &b| {
            labels[a]
                .cmp(&labels[b])
                .then_with(|| boxes[a].bbox.y1.total_cmp(&boxes[b].bbox.y1))
                .then_with(|| boxes[a].bbox.x1.total_cmp(&boxes[b].bbox.x1))
                .then_with(|| boxes[a].id.cmp(&boxes[b].id))
        });
        let next = ready.remove(0);
        order.push(boxes[next].id.clone());

        if let Some(succ) = successors.get(&next) {
            for &j in succ {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(j);
                }
            }
        }
    }

    (order.len() == n).then_some(order)
}

/// Cycle fallback: top-y, then ID.
fn top_y_fallback(boxes: &[LayoutBox]) -> Vec<String> {
    let mut indices: Vec<usize> = (0..boxes.len()).collect();
    indices.sort_by(|&a, &b| {
        boxes[a]
            .bbox
            .y1
            .total_cmp(&boxes[b].bbox.y1)
            .then_with(|| boxes[a].id.cmp(&boxes[b].id))
    });
    indices.into_iter().map(|i| boxes[i].id.clone()).collect()
}
