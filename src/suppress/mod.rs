//! Greedy rotated-box suppression.
//!
//! The scalar module is the reference implementation; the rayon module
//! parallelizes the overlap-marking row and must produce identical results.

pub(crate) mod scalar;

#[cfg(feature = "rayon")]
pub(crate) mod rayon;

use crate::geometry::RotatedBox;
use crate::workspace::ImageScratch;

/// Greedy rotated NMS over one image's candidates, with owned scratch.
///
/// Returns the kept candidate indices in keep order (descending score, ties
/// by original index), at most `max_keep` of them. Convenience entry point
/// for callers outside the batched workspace protocol; the batch engine uses
/// the same suppression internally on caller-provided scratch.
pub fn suppress_rotated(
    boxes: &[RotatedBox],
    scores: &[f32],
    nms_thresh: f32,
    max_keep: usize,
) -> Vec<u32> {
    let count = boxes.len();
    let cap = max_keep.min(count);
    let mut ranks = vec![0u32; count];
    let mut suppressed = vec![0u32; count];
    let mut kept = vec![0u32; cap];
    let n = {
        let mut scratch = ImageScratch {
            ranks: &mut ranks,
            suppressed: &mut suppressed,
            kept: &mut kept,
        };
        scalar::suppress_image(boxes, scores, nms_thresh, cap, &mut scratch)
    };
    kept.truncate(n);
    kept
}
