use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::types::{AtlasRect, BlockId, AIR, STONE};

#[derive(Clone, Debug)]
pub struct BlockDef {
    pub name: String,
    pub atlas: AtlasRect,
    pub solid: bool,
    pub opaque: bool,
}

/// Read-only catalog of block types, indexed by `BlockId`.
#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockDef>,
    pub by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registry carrying only the reserved `air` and `stone` entries.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register(BlockDef {
            name: "air".to_string(),
            atlas: AtlasRect::FULL,
            solid: false,
            opaque: false,
        });
        reg.register(BlockDef {
            name: "stone".to_string(),
            atlas: AtlasRect::FULL,
            solid: true,
            opaque: true,
        });
        debug_assert_eq!(reg.id_by_name("air"), Some(AIR));
        debug_assert_eq!(reg.id_by_name("stone"), Some(STONE));
        reg
    }

    /// Appends a definition; the new id is the previous block count.
    pub fn register(&mut self, def: BlockDef) -> BlockId {
        let id = self.blocks.len() as BlockId;
        self.by_name.insert(def.name.clone(), id);
        self.blocks.push(def);
        id
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockDef> {
        self.blocks.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Unknown ids behave like air.
    #[inline]
    pub fn is_solid(&self, id: BlockId) -> bool {
        self.blocks.get(id as usize).map_or(false, |d| d.solid)
    }

    /// Unknown ids behave like air.
    #[inline]
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.blocks.get(id as usize).map_or(false, |d| d.opaque)
    }

    #[inline]
    pub fn atlas_rect(&self, id: BlockId) -> AtlasRect {
        self.blocks
            .get(id as usize)
            .map_or(AtlasRect::FULL, |d| d.atlas)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        let mut reg = BlockRegistry::new();
        for entry in cfg.blocks {
            let solid = entry.solid.unwrap_or(true);
            reg.register(BlockDef {
                name: entry.name,
                atlas: entry.atlas.unwrap_or(AtlasRect::FULL),
                solid,
                opaque: entry.opaque.unwrap_or(solid),
            });
        }
        if reg.id_by_name("air") != Some(AIR) {
            return Err("block config must list \"air\" first (id 0)".into());
        }
        Ok(reg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

// --- Config ---

#[derive(Deserialize)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockEntry>,
}

#[derive(Deserialize)]
pub struct BlockEntry {
    pub name: String,
    #[serde(default)]
    pub atlas: Option<AtlasRect>,
    #[serde(default)]
    pub solid: Option<bool>,
    #[serde(default)]
    pub opaque: Option<bool>,
}
