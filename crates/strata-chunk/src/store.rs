use hashbrown::HashMap;
use strata_blocks::BlockId;

use crate::coord::ChunkCoord;
use crate::face::Face;
use crate::palette::PaletteChunk;

/// Associative store of chunks keyed by chunk coordinate.
///
/// Mutations happen on the orchestrator context at checkpoints; workers only
/// ever see copies of chunk contents.
#[derive(Default)]
pub struct ChunkStore {
    map: HashMap<ChunkCoord, PaletteChunk>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&PaletteChunk> {
        self.map.get(&coord)
    }

    #[inline]
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut PaletteChunk> {
        self.map.get_mut(&coord)
    }

    /// Insert-or-get: the chunk record, created unloaded on first reference.
    pub fn get_or_insert_unloaded(&mut self, coord: ChunkCoord) -> &mut PaletteChunk {
        self.map
            .entry(coord)
            .or_insert_with(|| PaletteChunk::unloaded(coord))
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<PaletteChunk> {
        self.map.remove(&coord)
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.map.contains_key(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &PaletteChunk)> {
        self.map.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ChunkCoord, &mut PaletteChunk)> {
        self.map.iter_mut()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.map.keys().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Block type at a world block coordinate; `None` when the containing
    /// chunk is absent or unloaded.
    pub fn block_at(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockId> {
        let coord = ChunkCoord::containing(wx, wy, wz);
        let chunk = self.map.get(&coord)?;
        if !chunk.is_loaded() {
            return None;
        }
        let (lx, ly, lz) = coord.local_of(wx, wy, wz);
        Some(chunk.get_block(lx, ly, lz))
    }

    /// The six axis neighbors of a chunk, in face order.
    pub fn neighbor_refs(&self, coord: ChunkCoord) -> [Option<&PaletteChunk>; 6] {
        let mut out = [None; 6];
        for (i, face) in Face::ALL.into_iter().enumerate() {
            out[i] = self.map.get(&coord.neighbor(face));
        }
        out
    }
}
