//! Procedural chunk generation: CPU fill variants and the GPU kernel contract.
#![forbid(unsafe_code)]

pub mod fill;
pub mod gen;
pub mod gpu;

pub use fill::pack_scratch;
pub use gen::{GenCtx, GenError, GenParams, GenVariant, Generator, GeneratorConfig};
pub use gpu::{generate_gpu, KernelUniforms, TerrainKernel, MAX_CHUNKS_PER_DISPATCH};
