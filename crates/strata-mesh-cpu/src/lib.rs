//! CPU-side mesh extraction and chunk face connectivity.
#![forbid(unsafe_code)]

pub mod build;
pub mod connectivity;
pub mod mesh_build;

pub use build::build_chunk_mesh;
pub use connectivity::{compute_connected_faces, FloodScratch};
pub use mesh_build::{MeshBuild, MeshData, PackedVertex, SubMesh, POS_UNITS_PER_BLOCK};
