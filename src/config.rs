use serde::Deserialize;

use strata_world::{GenParams, GenVariant, GeneratorConfig};

use crate::error::EngineError;

/// Engine-wide configuration, loadable from TOML.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct EngineConfig {
    /// Per-axis radius in chunks kept loaded around the viewer.
    pub view_distance: i32,
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub use_gpu_compute: bool,
    /// Treat absent neighbors as transparent during meshing.
    #[serde(default)]
    pub add_border_walls: bool,
    /// Connectivity analysis + visibility traversal; disabled when false.
    #[serde(default = "default_cull_chunks")]
    pub cull_chunks: bool,
}

fn default_cull_chunks() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            view_distance: 4,
            generator: GeneratorConfig {
                variant: GenVariant::Flat,
                params: GenParams::default(),
                seed: 0,
            },
            use_gpu_compute: false,
            add_border_walls: false,
            cull_chunks: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.view_distance < 1 {
            return Err(EngineError::ViewDistance(self.view_distance));
        }
        if !self.generator.variant.cpu_supported() && !self.use_gpu_compute {
            return Err(EngineError::GpuOnlyVariant(self.generator.variant));
        }
        Ok(())
    }
}
