//! Baseline serial greedy suppression.

use crate::candidate::rank::rank_by_score;
use crate::geometry::{rotated_iou, RotatedBox};
use crate::workspace::ImageScratch;

/// Runs greedy rotated NMS over one image's candidates.
///
/// Candidates are visited in descending score order (ties by original index).
/// A candidate is kept when its rotated IoU with every already-kept box is at
/// most `nms_thresh`; keeping stops once `max_keep` detections are kept.
/// Kept candidate indices land in `scratch.kept[..n]` in keep order and `n`
/// is returned.
pub(crate) fn suppress_image(
    boxes: &[RotatedBox],
    scores: &[f32],
    nms_thresh: f32,
    max_keep: usize,
    scratch: &mut ImageScratch<'_>,
) -> usize {
    let count = boxes.len();
    debug_assert_eq!(scores.len(), count);
    if count == 0 || max_keep == 0 {
        return 0;
    }

    rank_by_score(scores, scratch.ranks);
    scratch.suppressed.fill(0);

    let mut kept = 0usize;
    for pos in 0..count {
        if scratch.suppressed[pos] != 0 {
            continue;
        }
        let idx = scratch.ranks[pos] as usize;
        scratch.kept[kept] = idx as u32;
        kept += 1;
        if kept == max_keep {
            break;
        }

        // Suppressed-flag row: marking later candidates against the box just
        // kept is equivalent to the candidate-against-kept-set formulation.
        let kept_box = boxes[idx];
        for later in pos + 1..count {
            if scratch.suppressed[later] != 0 {
                continue;
            }
            let cand = scratch.ranks[later] as usize;
            if rotated_iou(&kept_box, &boxes[cand]) > nms_thresh {
                scratch.suppressed[later] = 1;
            }
        }
    }
    kept
}
