//! rotnms turns dense rotated-box detections into a small final set.
//!
//! This crate implements batched greedy non-maximum suppression over
//! arbitrarily rotated rectangles: exact rotated IoU via convex polygon
//! clipping, deterministic score ranking, a per-image greedy suppression
//! engine, and a batch dispatcher writing fixed-width output slots. Scratch
//! memory is caller-provided and sized ahead of time by a workspace oracle.
//! Optional parallelism via the `rayon` feature never changes results.

mod batch;
mod candidate;
pub mod config;
pub mod engine;
pub mod geometry;
mod suppress;
mod trace;
pub mod util;
pub mod workspace;

pub use batch::{BatchInputs, BatchOutputsMut};
pub use candidate::rank::rank_by_score;
pub use config::{NmsConfig, ENCODED_CONFIG_LEN};
pub use engine::{
    create_engine, register_engine, DataType, EngineFactory, ExecutionContext, MemoryLayout,
    RotatedNmsEngine, ENGINE_NAME, ENGINE_VERSION,
};
pub use geometry::{rotated_iou, RotatedBox, FLOATS_PER_BOX};
pub use suppress::suppress_rotated;
pub use util::{RotNmsError, RotNmsResult};
pub use workspace::{WorkspaceLayout, WorkspaceSizeCache, WORKSPACE_ALIGN};
