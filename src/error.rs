use thiserror::Error;

use strata_world::{GenError, GenVariant};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("view_distance must be >= 1, got {0}")]
    ViewDistance(i32),
    #[error("generator variant {0:?} is gpu-only; enable use_gpu_compute and attach a backend")]
    GpuOnlyVariant(GenVariant),
    #[error("edit box size must be non-negative, got {0:?}")]
    InvalidEditBox([i32; 3]),
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error(transparent)]
    Gen(#[from] GenError),
}
