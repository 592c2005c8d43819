//! Workspace sizing and partitioning.
//!
//! The engine never allocates scratch memory: callers query the byte size for
//! a shape with [`WorkspaceLayout::required_bytes`] and pass a buffer of at
//! least that size to every run. Sizing and execution share the same layout
//! arithmetic, so the quantity returned ahead of time is exactly what the run
//! partitions.
//!
//! Per-image scratch is three word arrays: the rank permutation (`count`),
//! the suppressed-flag row (`count`), and the kept-index list
//! (`detections_per_im`). The byte budget includes alignment slack so any
//! caller-provided `&mut [u8]` can be used.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::util::{RotNmsError, RotNmsResult};

/// Alignment required for the typed scratch words.
pub const WORKSPACE_ALIGN: usize = std::mem::align_of::<u32>();

const WORD_BYTES: usize = std::mem::size_of::<u32>();

/// Scratch-memory shape for one batched suppression call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkspaceLayout {
    /// Number of images in the batch.
    pub batch_size: usize,
    /// Candidates per image.
    pub count: usize,
    /// Output slots per image.
    pub detections_per_im: usize,
}

impl WorkspaceLayout {
    /// Creates a layout for the given shape.
    pub fn new(batch_size: usize, count: usize, detections_per_im: usize) -> Self {
        Self {
            batch_size,
            count,
            detections_per_im,
        }
    }

    /// Scratch words needed for one image.
    pub(crate) fn words_per_image(&self) -> RotNmsResult<usize> {
        self.count
            .checked_mul(2)
            .and_then(|w| w.checked_add(self.detections_per_im))
            .ok_or(RotNmsError::SizeOverflow)
    }

    fn body_bytes(&self) -> RotNmsResult<usize> {
        self.words_per_image()?
            .checked_mul(self.batch_size)
            .and_then(|w| w.checked_mul(WORD_BYTES))
            .ok_or(RotNmsError::SizeOverflow)
    }

    /// Bytes of caller-provided workspace required for this shape.
    ///
    /// Computable without running anything; the same inputs always return the
    /// same size.
    pub fn required_bytes(&self) -> RotNmsResult<usize> {
        self.body_bytes()?
            .checked_add(WORKSPACE_ALIGN - 1)
            .ok_or(RotNmsError::SizeOverflow)
    }

    /// Partitions a caller buffer into typed scratch words.
    pub(crate) fn bind<'a>(&self, buf: &'a mut [u8]) -> RotNmsResult<WorkspaceView<'a>> {
        let needed = self.required_bytes()?;
        if buf.len() < needed {
            return Err(RotNmsError::WorkspaceTooSmall {
                needed,
                got: buf.len(),
            });
        }

        let offset = buf.as_ptr().align_offset(WORKSPACE_ALIGN);
        if offset >= WORKSPACE_ALIGN {
            return Err(RotNmsError::WorkspaceMisaligned);
        }
        let body = self.body_bytes()?;
        let region = &mut buf[offset..offset + body];
        let words: &mut [u32] = bytemuck::try_cast_slice_mut(region)
            .map_err(|_| RotNmsError::WorkspaceMisaligned)?;
        Ok(WorkspaceView {
            words,
            layout: *self,
        })
    }
}

/// Typed view of the workspace, split per image by the dispatcher.
pub(crate) struct WorkspaceView<'a> {
    pub(crate) words: &'a mut [u32],
    pub(crate) layout: WorkspaceLayout,
}

/// Per-image scratch regions.
pub(crate) struct ImageScratch<'a> {
    /// Rank permutation, length `count`.
    pub(crate) ranks: &'a mut [u32],
    /// Suppressed flags aligned with the rank order, length `count`.
    pub(crate) suppressed: &'a mut [u32],
    /// Kept candidate indices, length `detections_per_im`.
    pub(crate) kept: &'a mut [u32],
}

/// Splits one image's scratch chunk into its three regions.
pub(crate) fn split_scratch(chunk: &mut [u32], count: usize) -> ImageScratch<'_> {
    let (ranks, rest) = chunk.split_at_mut(count);
    let (suppressed, kept) = rest.split_at_mut(count);
    ImageScratch {
        ranks,
        suppressed,
        kept,
    }
}

/// Memoized workspace sizes keyed by shape.
///
/// Kept separate from the immutable engine configuration; repeated queries at
/// the same shape hit the map instead of recomputing.
#[derive(Debug, Default)]
pub struct WorkspaceSizeCache {
    sizes: Mutex<HashMap<WorkspaceLayout, usize>>,
}

impl WorkspaceSizeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the required byte size for `layout`, memoized.
    pub fn bytes_for(&self, layout: WorkspaceLayout) -> RotNmsResult<usize> {
        let mut sizes = self
            .sizes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(&bytes) = sizes.get(&layout) {
            return Ok(bytes);
        }
        let bytes = layout.required_bytes()?;
        sizes.insert(layout, bytes);
        Ok(bytes)
    }
}
