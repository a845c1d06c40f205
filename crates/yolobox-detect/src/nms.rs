//! Per-class greedy non-maximum suppression.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::trace;

use crate::Detection;

/// Intersection-over-union of two centre-form boxes.
///
/// Returns 0 when the union is not positive (degenerate boxes).
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let [ax1, ay1, ax2, ay2] = a.corners();
    let [bx1, by1, bx2, by2] = b.corners();

    let iw = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let ih = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let inter = iw * ih;
    let union = a.area() + b.area() - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Keep the locally best boxes of each class.
///
/// Candidates are grouped by class id (an unset class is its own group)
/// and never suppress across groups. Within a group, boxes are visited by
/// descending confidence (ties keep input order); a box is dropped when
/// its IoU with an already kept box is strictly greater than
/// `iou_threshold`.
pub fn non_max_suppression(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut groups: BTreeMap<Option<usize>, Vec<Detection>> = BTreeMap::new();
    for det in detections {
        groups.entry(det.class_id).or_default().push(*det);
    }

    let mut kept = Vec::with_capacity(detections.len());
    for (class_id, mut group) in groups {
        // stable: equal confidences stay in decode order
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            kept.push(group[i]);
            for j in (i + 1)..group.len() {
                if !suppressed[j] && iou(&group[i], &group[j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
        trace!(?class_id, candidates = group.len(), "class suppressed");
    }
    kept
}

/// [`non_max_suppression`] over every image of a batch, in parallel.
pub fn suppress_batch(batch: &[Vec<Detection>], iou_threshold: f32) -> Vec<Vec<Detection>> {
    batch
        .par_iter()
        .map(|dets| non_max_suppression(dets, iou_threshold))
        .collect()
}
