//! Error types for rotnms.

use thiserror::Error;

/// Result alias for rotnms operations.
pub type RotNmsResult<T> = std::result::Result<T, RotNmsError>;

/// Errors that can occur when configuring or running the suppression engine.
///
/// Configuration and format errors are detected before any computation runs;
/// resource errors abort the in-flight batch with no partial-output guarantee.
#[derive(Debug, Error, PartialEq)]
pub enum RotNmsError {
    /// A configuration parameter is out of its valid range.
    #[error("invalid configuration: {field} must be positive, got {value}")]
    InvalidConfig { field: &'static str, value: f64 },
    /// Input arrays disagree on the number of candidates they describe.
    #[error(
        "dimension mismatch: boxes length {boxes} must be 6x scores length {scores}, \
         classes length {classes} must equal scores length"
    )]
    DimensionMismatch {
        boxes: usize,
        scores: usize,
        classes: usize,
    },
    /// A shape parameter disagrees with the engine configuration.
    #[error("shape mismatch: {field} expected {expected}, got {got}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    /// An input or output buffer is shorter than the batch shape requires.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The caller-provided workspace does not cover the required scratch size.
    #[error("workspace too small: needed {needed} bytes, got {got}")]
    WorkspaceTooSmall { needed: usize, got: usize },
    /// A workspace or batch shape does not fit in addressable memory.
    #[error("workspace size overflows usize")]
    SizeOverflow,
    /// The workspace buffer cannot be aligned for word-sized scratch.
    #[error("workspace buffer misaligned for u32 scratch")]
    WorkspaceMisaligned,
    /// The negotiated data type or memory layout is not supported.
    #[error("unsupported format: {dtype} / {layout}")]
    UnsupportedFormat {
        dtype: &'static str,
        layout: &'static str,
    },
    /// A serialized configuration blob has the wrong length.
    #[error("malformed serialized config: expected {expected} bytes, got {got}")]
    MalformedConfig { expected: usize, got: usize },
    /// No engine factory is registered under the requested name/version.
    #[error("unknown engine: {name} version {version}")]
    UnknownEngine { name: String, version: String },
}
