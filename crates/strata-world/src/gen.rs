use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;
use thiserror::Error;

use strata_chunk::CHUNK_VOLUME;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenVariant {
    Flat,
    Plane,
    Simplex2d,
    Perlin2d,
    Simplex3d,
    Perlin3d,
    CustomTerrain,
}

impl GenVariant {
    /// Every variant has a kernel; `CustomTerrain` exists only there.
    #[inline]
    pub fn gpu_supported(self) -> bool {
        true
    }

    #[inline]
    pub fn cpu_supported(self) -> bool {
        !matches!(self, GenVariant::CustomTerrain)
    }

    /// Kernel-name selector for the dispatch collaborator.
    pub fn kernel_name(self) -> &'static str {
        match self {
            GenVariant::Flat => "terrain_flat",
            GenVariant::Plane => "terrain_plane",
            GenVariant::Simplex2d => "terrain_simplex2d",
            GenVariant::Perlin2d => "terrain_perlin2d",
            GenVariant::Simplex3d => "terrain_simplex3d",
            GenVariant::Perlin3d => "terrain_perlin3d",
            GenVariant::CustomTerrain => "terrain_custom",
        }
    }
}

/// Shared generator factors: two vector factors applied to sample
/// coordinates and two scalar factors applied to the noise value.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenParams {
    pub offset: [f32; 3],
    pub scale: [f32; 3],
    pub offset2: f32,
    pub scale2: f32,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            scale: [1.0; 3],
            offset2: 0.0,
            scale2: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct GeneratorConfig {
    pub variant: GenVariant,
    #[serde(default)]
    pub params: GenParams,
    #[serde(default)]
    pub seed: i32,
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error("generator variant {0:?} is gpu-only and cannot run on the cpu")]
    GpuOnlyVariant(GenVariant),
    #[error("generation cancelled")]
    Cancelled,
    #[error("terrain kernel dispatch failed: {0}")]
    Kernel(String),
    #[error("kernel readback size mismatch: expected {expected} bytes, got {actual}")]
    ReadbackSize { expected: usize, actual: usize },
}

/// Immutable generator description shared by every worker during a pass.
#[derive(Clone, Debug)]
pub struct Generator {
    pub variant: GenVariant,
    pub params: GenParams,
    pub seed: i32,
}

impl Generator {
    pub fn new(variant: GenVariant, params: GenParams, seed: i32) -> Self {
        Self {
            variant,
            params,
            seed,
        }
    }

    pub fn from_config(cfg: &GeneratorConfig) -> Self {
        Self::new(cfg.variant, cfg.params, cfg.seed)
    }

    /// Per-worker sampling context. Noise instances are seeded here so the
    /// same seed always reproduces the same field, on any thread.
    pub fn make_ctx(&self) -> GenCtx {
        let noise = match self.variant {
            GenVariant::Simplex2d | GenVariant::Simplex3d => {
                let mut n = FastNoiseLite::with_seed(self.seed);
                n.set_noise_type(Some(NoiseType::OpenSimplex2));
                n.set_frequency(Some(1.0));
                Some(n)
            }
            GenVariant::Perlin2d | GenVariant::Perlin3d => {
                let mut n = FastNoiseLite::with_seed(self.seed);
                n.set_noise_type(Some(NoiseType::Perlin));
                n.set_frequency(Some(1.0));
                Some(n)
            }
            GenVariant::Flat | GenVariant::Plane | GenVariant::CustomTerrain => None,
        };
        GenCtx {
            noise,
            scratch: vec![0u8; CHUNK_VOLUME],
        }
    }
}

/// Reusable per-worker scratch: the seeded noise instance plus the dense
/// fill buffer.
pub struct GenCtx {
    pub(crate) noise: Option<FastNoiseLite>,
    pub scratch: Vec<u8>,
}
