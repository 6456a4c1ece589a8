//! Chunk-streaming voxel world engine core.
//!
//! The engine keeps a sparse grid of palette-compressed 16^3 chunks loaded
//! around a moving viewpoint, fills them procedurally (CPU workers or a GPU
//! kernel collaborator), extracts face-culled meshes, analyzes face
//! connectivity for occlusion culling, and serves visibility traversal,
//! raycasts, and box edits over the result.
#![forbid(unsafe_code)]

pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod raycast;
pub mod visibility;

pub use config::EngineConfig;
pub use engine::{ChunkRender, Engine, EngineStats, Transform, MESH_WORLD_SCALE};
pub use error::EngineError;
pub use raycast::{raycast, RayHit};
pub use visibility::{traverse_visible, Viewpoint, VisibleChunk};

pub use strata_blocks::{AtlasRect, BlockId, BlockRegistry, AIR, STONE};
pub use strata_chunk::{ChunkCoord, ChunkStore, Face, PaletteChunk, CHUNK_SIZE};
pub use strata_geom::{Aabb, Frustum, Plane, Vec3};
pub use strata_mesh_cpu::{MeshData, PackedVertex, SubMesh};
pub use strata_world::{GenParams, GenVariant, GeneratorConfig, KernelUniforms, TerrainKernel};
