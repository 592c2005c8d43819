//! Batched dispatch: validated input/output views and per-image fan-out.
//!
//! Inputs are three parallel, densely packed f32 arrays per batch; outputs
//! are fixed-width slots of `detections_per_im` entries per image. Every
//! image is processed independently with its own scratch region, so image
//! `i`'s output depends only on image `i`'s input and no synchronization
//! crosses image boundaries.

use crate::config::NmsConfig;
use crate::geometry::{RotatedBox, FLOATS_PER_BOX};
use crate::suppress::scalar::suppress_image;
use crate::trace::{trace_event, trace_span};
use crate::util::{RotNmsError, RotNmsResult};
use crate::workspace::{split_scratch, WorkspaceView};

#[cfg(feature = "rayon")]
use crate::suppress::rayon::suppress_image_par;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Borrowed per-batch candidate arrays.
///
/// Construction validates the dimension-consistency precondition: the boxes
/// array must be exactly `6x` the scores array, and classes must match
/// scores. Violations are configuration errors detected before any
/// computation.
pub struct BatchInputs<'a> {
    pub(crate) scores: &'a [f32],
    pub(crate) boxes: &'a [RotatedBox],
    pub(crate) classes: &'a [f32],
    batch_size: usize,
    count: usize,
}

impl<'a> BatchInputs<'a> {
    /// Creates a validated view over packed candidate arrays.
    ///
    /// `boxes` holds `6` floats per candidate in box order; all three arrays
    /// must cover `batch_size * count` candidates.
    pub fn new(
        scores: &'a [f32],
        boxes: &'a [f32],
        classes: &'a [f32],
        batch_size: usize,
        count: usize,
    ) -> RotNmsResult<Self> {
        if boxes.len() != scores.len() * FLOATS_PER_BOX || classes.len() != scores.len() {
            return Err(RotNmsError::DimensionMismatch {
                boxes: boxes.len(),
                scores: scores.len(),
                classes: classes.len(),
            });
        }
        let entries = batch_size
            .checked_mul(count)
            .ok_or(RotNmsError::SizeOverflow)?;
        if scores.len() < entries {
            return Err(RotNmsError::BufferTooSmall {
                needed: entries,
                got: scores.len(),
            });
        }
        let boxes: &[RotatedBox] =
            bytemuck::try_cast_slice(boxes).map_err(|_| RotNmsError::DimensionMismatch {
                boxes: boxes.len(),
                scores: scores.len(),
                classes: classes.len(),
            })?;
        Ok(Self {
            scores,
            boxes,
            classes,
            batch_size,
            count,
        })
    }

    /// Number of images in the batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Candidates per image.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Mutable fixed-width per-batch output slots.
pub struct BatchOutputsMut<'a> {
    pub(crate) boxes: &'a mut [RotatedBox],
    pub(crate) scores: &'a mut [f32],
    pub(crate) classes: &'a mut [f32],
    batch_size: usize,
    detections_per_im: usize,
}

impl<'a> BatchOutputsMut<'a> {
    /// Creates a validated view over packed output arrays.
    pub fn new(
        boxes: &'a mut [f32],
        scores: &'a mut [f32],
        classes: &'a mut [f32],
        batch_size: usize,
        detections_per_im: usize,
    ) -> RotNmsResult<Self> {
        if boxes.len() != scores.len() * FLOATS_PER_BOX || classes.len() != scores.len() {
            return Err(RotNmsError::DimensionMismatch {
                boxes: boxes.len(),
                scores: scores.len(),
                classes: classes.len(),
            });
        }
        let slots = batch_size
            .checked_mul(detections_per_im)
            .ok_or(RotNmsError::SizeOverflow)?;
        if scores.len() < slots {
            return Err(RotNmsError::BufferTooSmall {
                needed: slots,
                got: scores.len(),
            });
        }
        let scores_len = scores.len();
        let classes_len = classes.len();
        let boxes: &mut [RotatedBox] =
            bytemuck::try_cast_slice_mut(boxes).map_err(|_| RotNmsError::DimensionMismatch {
                boxes: scores_len * FLOATS_PER_BOX,
                scores: scores_len,
                classes: classes_len,
            })?;
        Ok(Self {
            boxes,
            scores,
            classes,
            batch_size,
            detections_per_im,
        })
    }

    /// Number of images in the batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Output slots per image.
    pub fn detections_per_im(&self) -> usize {
        self.detections_per_im
    }
}

/// Packs one image's kept detections into its fixed-width output slot.
///
/// Kept detections are written in keep order; every unused slot is zeroed so
/// the full output is defined and byte-stable.
fn pack_image(
    boxes: &[RotatedBox],
    scores: &[f32],
    classes: &[f32],
    kept: &[u32],
    out_boxes: &mut [RotatedBox],
    out_scores: &mut [f32],
    out_classes: &mut [f32],
) {
    out_boxes.fill(RotatedBox::default());
    out_scores.fill(0.0);
    out_classes.fill(0.0);
    for (slot, &idx) in kept.iter().enumerate() {
        let idx = idx as usize;
        out_boxes[slot] = boxes[idx];
        out_scores[slot] = scores[idx];
        out_classes[slot] = classes[idx];
    }
}

/// Runs one suppression instance per image and packs the fixed-width outputs.
pub(crate) fn run_batch(
    config: &NmsConfig,
    inputs: &BatchInputs<'_>,
    outputs: &mut BatchOutputsMut<'_>,
    workspace: &mut WorkspaceView<'_>,
    parallel: bool,
) -> RotNmsResult<()> {
    let batch = inputs.batch_size;
    let count = inputs.count;
    let det = outputs.detections_per_im;
    let words_per_image = workspace.layout.words_per_image()?;

    let _span = trace_span!("nms_batch", images = batch, count = count).entered();

    #[cfg(feature = "rayon")]
    if parallel {
        run_batch_par(config, inputs, outputs, workspace, words_per_image);
        trace_event!("nms_batch_done", images = batch);
        return Ok(());
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    for image in 0..batch {
        let in_scores = &inputs.scores[image * count..(image + 1) * count];
        let in_boxes = &inputs.boxes[image * count..(image + 1) * count];
        let in_classes = &inputs.classes[image * count..(image + 1) * count];
        let chunk = &mut workspace.words[image * words_per_image..(image + 1) * words_per_image];
        let mut scratch = split_scratch(chunk, count);

        let kept = suppress_image(
            in_boxes,
            in_scores,
            config.nms_thresh,
            det.min(count),
            &mut scratch,
        );

        let out_boxes = &mut outputs.boxes[image * det..(image + 1) * det];
        let out_scores = &mut outputs.scores[image * det..(image + 1) * det];
        let out_classes = &mut outputs.classes[image * det..(image + 1) * det];
        pack_image(
            in_boxes,
            in_scores,
            in_classes,
            &scratch.kept[..kept],
            out_boxes,
            out_scores,
            out_classes,
        );
    }

    trace_event!("nms_batch_done", images = batch);
    Ok(())
}

/// Image-parallel dispatch: disjoint scratch, input and output chunks per
/// image, zero cross-image synchronization.
#[cfg(feature = "rayon")]
fn run_batch_par(
    config: &NmsConfig,
    inputs: &BatchInputs<'_>,
    outputs: &mut BatchOutputsMut<'_>,
    workspace: &mut WorkspaceView<'_>,
    words_per_image: usize,
) {
    let batch = inputs.batch_size;
    let count = inputs.count;
    let det = outputs.detections_per_im;

    let entries = batch * count;
    let slots = batch * det;
    let in_scores = &inputs.scores[..entries];
    let in_boxes = &inputs.boxes[..entries];
    let in_classes = &inputs.classes[..entries];
    let out_boxes = &mut outputs.boxes[..slots];
    let out_scores = &mut outputs.scores[..slots];
    let out_classes = &mut outputs.classes[..slots];

    workspace
        .words
        .par_chunks_exact_mut(words_per_image)
        .zip(out_boxes.par_chunks_exact_mut(det))
        .zip(out_scores.par_chunks_exact_mut(det))
        .zip(out_classes.par_chunks_exact_mut(det))
        .zip(in_scores.par_chunks_exact(count))
        .zip(in_boxes.par_chunks_exact(count))
        .zip(in_classes.par_chunks_exact(count))
        .for_each(
            |((((((chunk, ob), os), oc), scores), boxes), classes)| {
                let mut scratch = split_scratch(chunk, count);
                let kept = suppress_image_par(
                    boxes,
                    scores,
                    config.nms_thresh,
                    det.min(count),
                    &mut scratch,
                );
                pack_image(boxes, scores, classes, &scratch.kept[..kept], ob, os, oc);
            },
        );
}

#[cfg(test)]
mod tests {
    use super::{BatchInputs, BatchOutputsMut};
    use crate::util::RotNmsError;

    #[test]
    fn inputs_reject_mismatched_box_length() {
        let scores = [0.5f32; 2];
        let boxes = [0.0f32; 11];
        let classes = [0.0f32; 2];
        let err = BatchInputs::new(&scores, &boxes, &classes, 1, 2)
            .err()
            .unwrap();
        assert_eq!(
            err,
            RotNmsError::DimensionMismatch {
                boxes: 11,
                scores: 2,
                classes: 2,
            }
        );
    }

    #[test]
    fn inputs_reject_mismatched_class_length() {
        let scores = [0.5f32; 2];
        let boxes = [0.0f32; 12];
        let classes = [0.0f32; 3];
        assert!(BatchInputs::new(&scores, &boxes, &classes, 1, 2).is_err());
    }

    #[test]
    fn inputs_reject_short_buffers_for_shape() {
        let scores = [0.5f32; 2];
        let boxes = [0.0f32; 12];
        let classes = [0.0f32; 2];
        let err = BatchInputs::new(&scores, &boxes, &classes, 2, 2)
            .err()
            .unwrap();
        assert_eq!(err, RotNmsError::BufferTooSmall { needed: 4, got: 2 });
    }

    #[test]
    fn outputs_reject_mismatched_lengths() {
        let mut boxes = [0.0f32; 12];
        let mut scores = [0.0f32; 3];
        let mut classes = [0.0f32; 3];
        assert!(BatchOutputsMut::new(&mut boxes, &mut scores, &mut classes, 1, 2).is_err());
    }

    #[test]
    fn valid_views_report_shape() {
        let scores = [0.5f32; 4];
        let boxes = [0.0f32; 24];
        let classes = [0.0f32; 4];
        let inputs = BatchInputs::new(&scores, &boxes, &classes, 2, 2).unwrap();
        assert_eq!(inputs.batch_size(), 2);
        assert_eq!(inputs.count(), 2);
    }
}
