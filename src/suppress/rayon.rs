//! Rayon-parallel greedy suppression (feature-gated).
//!
//! The keep/discard decision is a serial dependency in ranked order, but the
//! overlap row marked after each keep is embarrassingly parallel. This module
//! parallelizes exactly that row; the result is bit-identical to the scalar
//! implementation because every flag is written from a pure comparison
//! against the single box just kept.

use crate::candidate::rank::rank_by_score;
use crate::geometry::{rotated_iou, RotatedBox};
use crate::workspace::ImageScratch;
use rayon::prelude::*;

/// Parallel-row variant of [`crate::suppress::scalar::suppress_image`].
pub(crate) fn suppress_image_par(
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

        let kept_box = boxes[idx];
        let later_flags = &mut scratch.suppressed[pos + 1..];
        let later_ranks = &scratch.ranks[pos + 1..];
        later_flags
            .par_iter_mut()
            .zip(later_ranks.par_iter())
            .for_each(|(flag, &cand)| {
                if *flag == 0 && rotated_iou(&kept_box, &boxes[cand as usize]) > nms_thresh {
                    *flag = 1;
                }
            });
    }
    kept
}
