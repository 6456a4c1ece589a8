//! Chunk coordinates, palette-compressed block storage, and the chunk store.
#![forbid(unsafe_code)]

pub mod coord;
pub mod face;
pub mod palette;
pub mod store;

pub use coord::{ceil_div, linear_index, ChunkCoord, CHUNK_SIZE, CHUNK_SIZE_I, CHUNK_VOLUME};
pub use face::{
    face_has_any_pair, face_set_to_pair_mask, faces_connected, pair_bit, pair_index, Face,
    ALL_FACE_PAIRS, FACE_PAIR_COUNT,
};
pub use palette::{PaletteChunk, CONNECTIVITY_DIRTY};
pub use store::ChunkStore;
