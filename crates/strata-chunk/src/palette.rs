use strata_blocks::{BlockId, AIR};

use crate::coord::{linear_index, ChunkCoord, CHUNK_VOLUME};
use crate::face::ALL_FACE_PAIRS;

/// Sentinel for a connectivity mask that no longer reflects the block
/// contents. Valid masks use only the low 15 bits.
pub const CONNECTIVITY_DIRTY: u16 = !0;

/// A fixed-size cube of blocks stored behind a per-chunk palette.
///
/// The palette is the ordered set of block types present; the dense index
/// array exists only while more than one type is present. An empty palette
/// means the chunk has been created but not yet filled.
#[derive(Clone, Debug)]
pub struct PaletteChunk {
    pub coord: ChunkCoord,
    palette: Vec<BlockId>,
    blocks: Option<Vec<u8>>,
    pub connected_faces: u16,
    pub is_pending_update: bool,
    pub is_in_view_distance: bool,
    /// Bumped on every content change; stale worker results compare against it.
    pub rev: u64,
}

impl PaletteChunk {
    pub fn unloaded(coord: ChunkCoord) -> Self {
        Self {
            coord,
            palette: Vec::new(),
            blocks: None,
            connected_faces: CONNECTIVITY_DIRTY,
            is_pending_update: false,
            is_in_view_distance: false,
            rev: 0,
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        !self.palette.is_empty()
    }

    #[inline]
    pub fn palette(&self) -> &[BlockId] {
        &self.palette
    }

    #[inline]
    pub fn blocks(&self) -> Option<&[u8]> {
        self.blocks.as_deref()
    }

    /// The single block type when the chunk is uniform.
    #[inline]
    pub fn uniform_block(&self) -> Option<BlockId> {
        if self.palette.len() == 1 {
            Some(self.palette[0])
        } else {
            None
        }
    }

    /// Block type at a local coordinate. Unloaded chunks read as air.
    #[inline]
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        match self.palette.len() {
            0 => AIR,
            1 => self.palette[0],
            _ => {
                let blocks = self.blocks.as_ref().expect("multi-palette chunk is dense");
                self.palette[blocks[linear_index(x, y, z)] as usize]
            }
        }
    }

    /// Block type at a linear address.
    #[inline]
    pub fn get_block_linear(&self, i: usize) -> BlockId {
        match self.palette.len() {
            0 => AIR,
            1 => self.palette[0],
            _ => {
                let blocks = self.blocks.as_ref().expect("multi-palette chunk is dense");
                self.palette[blocks[i] as usize]
            }
        }
    }

    /// Replaces the whole chunk with a single block type, freeing dense storage.
    pub fn set_single_palette(&mut self, t: BlockId) {
        self.palette.clear();
        self.palette.push(t);
        self.blocks = None;
        // A uniform air chunk is fully open; anything else needs a recompute.
        self.connected_faces = if t == AIR {
            ALL_FACE_PAIRS
        } else {
            CONNECTIVITY_DIRTY
        };
    }

    /// Allocates the dense index array ahead of introducing a second palette
    /// entry. All cells point at the existing single entry (index 0).
    pub fn ensure_dense(&mut self) {
        debug_assert!(self.is_loaded());
        if self.blocks.is_none() {
            self.blocks = Some(vec![0u8; CHUNK_VOLUME]);
        }
    }

    /// Index of `t` in the palette, appending it if absent.
    /// Returns `None` when the palette is full and `t` is not present.
    pub fn add_to_palette(&mut self, t: BlockId) -> Option<u8> {
        if let Some(i) = self.palette.iter().position(|&p| p == t) {
            return Some(i as u8);
        }
        if self.palette.len() >= 256 {
            return None;
        }
        self.palette.push(t);
        Some((self.palette.len() - 1) as u8)
    }

    /// Writes a palette index into the dense array. The chunk must be dense.
    #[inline]
    pub fn set_block_index(&mut self, x: usize, y: usize, z: usize, idx: u8) {
        debug_assert!((idx as usize) < self.palette.len());
        let blocks = self.blocks.as_mut().expect("dense array not allocated");
        blocks[linear_index(x, y, z)] = idx;
    }

    /// Drops palette entries no dense cell references and renumbers the rest.
    /// Collapses to a single-entry palette when only one entry remains.
    pub fn compact(&mut self) {
        let Some(blocks) = self.blocks.as_mut() else {
            return;
        };
        let mut used = [false; 256];
        for &b in blocks.iter() {
            used[b as usize] = true;
        }
        let mut remap = [0u8; 256];
        let mut new_palette = Vec::with_capacity(self.palette.len());
        for (i, &t) in self.palette.iter().enumerate() {
            if used[i] {
                remap[i] = new_palette.len() as u8;
                new_palette.push(t);
            }
        }
        if new_palette.len() == self.palette.len() {
            return;
        }
        for b in blocks.iter_mut() {
            *b = remap[*b as usize];
        }
        self.palette = new_palette;
        if self.palette.len() == 1 {
            let t = self.palette[0];
            self.set_single_palette(t);
        }
    }

    /// Shrinks back to a uniform chunk when every dense cell agrees.
    pub fn collapse_if_uniform(&mut self) {
        let Some(blocks) = self.blocks.as_ref() else {
            return;
        };
        let first = blocks[0];
        if blocks.iter().all(|&b| b == first) {
            let t = self.palette[first as usize];
            self.set_single_palette(t);
        }
    }

    /// Installs filled contents: a uniform chunk when the palette has one
    /// entry, otherwise the palette plus a full dense index array.
    pub fn load_dense(&mut self, palette: Vec<BlockId>, bytes: Vec<u8>) {
        debug_assert!(!palette.is_empty());
        if palette.len() == 1 {
            self.set_single_palette(palette[0]);
            return;
        }
        debug_assert_eq!(bytes.len(), CHUNK_VOLUME);
        debug_assert!(bytes.iter().all(|&b| (b as usize) < palette.len()));
        self.palette = palette;
        self.blocks = Some(bytes);
        self.connected_faces = CONNECTIVITY_DIRTY;
    }

    /// Takes over the block contents of a freshly generated chunk, keeping
    /// this record's lifecycle flags and revision.
    pub fn adopt_contents(&mut self, other: PaletteChunk) {
        debug_assert_eq!(self.coord, other.coord);
        self.palette = other.palette;
        self.blocks = other.blocks;
        self.connected_faces = other.connected_faces;
    }

    /// Releases all storage and returns the chunk to the unloaded state.
    pub fn dispose(&mut self) {
        self.palette = Vec::new();
        self.blocks = None;
        self.connected_faces = CONNECTIVITY_DIRTY;
        self.is_pending_update = false;
        self.is_in_view_distance = false;
    }

    /// Connectivity for traversal: invalidated or unloaded chunks conduct fully.
    #[inline]
    pub fn connectivity_mask(&self) -> u16 {
        if self.connected_faces <= ALL_FACE_PAIRS {
            self.connected_faces
        } else {
            ALL_FACE_PAIRS
        }
    }

    #[inline]
    pub fn mark_connectivity_dirty(&mut self) {
        self.connected_faces = CONNECTIVITY_DIRTY;
    }

    /// Structural invariants; exercised by tests after every mutation path.
    pub fn invariants_ok(&self) -> bool {
        match self.palette.len() {
            0 => self.blocks.is_none(),
            1 => self.blocks.is_none(),
            n => match self.blocks.as_ref() {
                Some(blocks) => {
                    blocks.len() == CHUNK_VOLUME && blocks.iter().all(|&b| (b as usize) < n)
                }
                None => false,
            },
        }
    }
}
