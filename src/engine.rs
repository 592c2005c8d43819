//! Host boundary: engine lifecycle, format negotiation, and the registry.
//!
//! The engine follows a configure -> run -> release lifecycle: construct it
//! from a validated [`NmsConfig`] (or a serialized blob), query the required
//! workspace for a batch shape, then call [`RotatedNmsEngine::enqueue`] once
//! per batch. Dropping the engine releases it; no caller memory is retained
//! across calls.
//!
//! Hosts that create engines by name use the process-wide registry: a lookup
//! table mapping a `(name, version)` pair to a factory that decodes a
//! serialized configuration. The built-in engine is registered on first
//! access.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::batch::{run_batch, BatchInputs, BatchOutputsMut};
use crate::config::{NmsConfig, ENCODED_CONFIG_LEN};
use crate::util::{RotNmsError, RotNmsResult};
use crate::workspace::{WorkspaceLayout, WorkspaceSizeCache};

/// Registry name of the built-in rotated-NMS engine.
pub const ENGINE_NAME: &str = "rotated_nms";
/// Registry version of the built-in rotated-NMS engine.
pub const ENGINE_VERSION: &str = "1";

/// Numeric precision offered by the host during negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// Single-precision float, the only supported precision.
    F32,
    /// Half-precision float (declined).
    F16,
    /// 8-bit quantized (declined).
    I8,
}

impl DataType {
    fn name(self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F16 => "f16",
            DataType::I8 => "i8",
        }
    }
}

/// Memory layout offered by the host during negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryLayout {
    /// Densely packed row-major arrays, the only supported layout.
    Linear,
    /// Channel-vectorized packing (declined).
    Vectorized,
}

impl MemoryLayout {
    fn name(self) -> &'static str {
        match self {
            MemoryLayout::Linear => "linear",
            MemoryLayout::Vectorized => "vectorized",
        }
    }
}

/// Caller-supplied execution context for one batch call.
///
/// Stands in for a device queue/stream token: it selects how the batch is
/// decomposed without affecting the result.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionContext {
    /// Run images (and overlap rows) on the rayon pool when the `rayon`
    /// feature is enabled. Ignored otherwise.
    pub parallel: bool,
}

impl ExecutionContext {
    /// Context for strictly serial execution.
    pub fn serial() -> Self {
        Self { parallel: false }
    }

    /// Context requesting data-parallel execution.
    pub fn parallel() -> Self {
        Self { parallel: true }
    }
}

/// Batched rotated-NMS engine with a fixed, validated configuration.
pub struct RotatedNmsEngine {
    config: NmsConfig,
    sizes: WorkspaceSizeCache,
}

impl RotatedNmsEngine {
    /// Creates an engine, revalidating the configuration.
    pub fn new(config: NmsConfig) -> RotNmsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sizes: WorkspaceSizeCache::new(),
        })
    }

    /// Creates an engine from a serialized configuration blob.
    pub fn from_encoded(payload: &[u8]) -> RotNmsResult<Self> {
        Self::new(NmsConfig::decode(payload)?)
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &NmsConfig {
        &self.config
    }

    /// Serializes the configuration into its fixed schema.
    pub fn encode_config(&self) -> [u8; ENCODED_CONFIG_LEN] {
        self.config.encode()
    }

    /// Accepts or declines a host-offered precision and layout.
    ///
    /// Anything other than dense single-precision is declined here, before
    /// any computation is attempted.
    pub fn negotiate(&self, dtype: DataType, layout: MemoryLayout) -> RotNmsResult<()> {
        if dtype == DataType::F32 && layout == MemoryLayout::Linear {
            Ok(())
        } else {
            Err(RotNmsError::UnsupportedFormat {
                dtype: dtype.name(),
                layout: layout.name(),
            })
        }
    }

    /// Bytes of scratch workspace required for `batch_size` images.
    ///
    /// Memoized per shape; callers must query this before the first call at a
    /// given shape and supply at least this many bytes on every call.
    pub fn required_workspace(&self, batch_size: usize) -> RotNmsResult<usize> {
        self.sizes.bytes_for(self.layout_for(batch_size))
    }

    fn layout_for(&self, batch_size: usize) -> WorkspaceLayout {
        WorkspaceLayout::new(batch_size, self.config.count, self.config.detections_per_im)
    }

    /// Processes one batch synchronously.
    ///
    /// The workspace is owned exclusively by this call for its duration. On
    /// error the batch is aborted with no partial-output guarantee; nothing
    /// is retried internally.
    pub fn enqueue(
        &self,
        batch_size: usize,
        inputs: &BatchInputs<'_>,
        outputs: &mut BatchOutputsMut<'_>,
        workspace: &mut [u8],
        ctx: &ExecutionContext,
    ) -> RotNmsResult<()> {
        if inputs.batch_size() != batch_size {
            return Err(RotNmsError::ShapeMismatch {
                field: "input batch_size",
                expected: batch_size,
                got: inputs.batch_size(),
            });
        }
        if inputs.count() != self.config.count {
            return Err(RotNmsError::ShapeMismatch {
                field: "count",
                expected: self.config.count,
                got: inputs.count(),
            });
        }
        if outputs.batch_size() != batch_size {
            return Err(RotNmsError::ShapeMismatch {
                field: "output batch_size",
                expected: batch_size,
                got: outputs.batch_size(),
            });
        }
        if outputs.detections_per_im() != self.config.detections_per_im {
            return Err(RotNmsError::ShapeMismatch {
                field: "detections_per_im",
                expected: self.config.detections_per_im,
                got: outputs.detections_per_im(),
            });
        }

        let layout = self.layout_for(batch_size);
        let needed = self.sizes.bytes_for(layout)?;
        if workspace.len() < needed {
            return Err(RotNmsError::WorkspaceTooSmall {
                needed,
                got: workspace.len(),
            });
        }
        let mut view = layout.bind(workspace)?;
        run_batch(&self.config, inputs, outputs, &mut view, ctx.parallel)
    }
}

/// Factory decoding a serialized configuration into an engine.
pub type EngineFactory = fn(&[u8]) -> RotNmsResult<RotatedNmsEngine>;

type RegistryKey = (String, String);

static REGISTRY: OnceLock<Mutex<HashMap<RegistryKey, EngineFactory>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<RegistryKey, EngineFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<RegistryKey, EngineFactory> = HashMap::new();
        map.insert(
            (ENGINE_NAME.to_owned(), ENGINE_VERSION.to_owned()),
            RotatedNmsEngine::from_encoded,
        );
        Mutex::new(map)
    })
}

/// Registers an engine factory under a name/version pair.
///
/// Re-registering an existing pair replaces the factory.
pub fn register_engine(name: &str, version: &str, factory: EngineFactory) {
    let mut map = registry()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    map.insert((name.to_owned(), version.to_owned()), factory);
}

/// Creates an engine by registry name from a serialized configuration.
pub fn create_engine(name: &str, version: &str, payload: &[u8]) -> RotNmsResult<RotatedNmsEngine> {
    let factory = {
        let map = registry()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        map.get(&(name.to_owned(), version.to_owned())).copied()
    };
    match factory {
        Some(factory) => factory(payload),
        None => Err(RotNmsError::UnknownEngine {
            name: name.to_owned(),
            version: version.to_owned(),
        }),
    }
}
