use strata_blocks::BlockRegistry;
use strata_chunk::{face_set_to_pair_mask, Face, PaletteChunk, ALL_FACE_PAIRS, CHUNK_VOLUME};

const S: usize = strata_chunk::CHUNK_SIZE;

/// Reusable flood-fill state: one visited bit per cell plus the BFS queue.
pub struct FloodScratch {
    visited: [u64; CHUNK_VOLUME / 64],
    queue: Vec<u16>,
}

impl Default for FloodScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl FloodScratch {
    pub fn new() -> Self {
        Self {
            visited: [0u64; CHUNK_VOLUME / 64],
            queue: Vec::with_capacity(CHUNK_VOLUME),
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.visited = [0u64; CHUNK_VOLUME / 64];
        self.queue.clear();
    }

    #[inline]
    fn is_visited(&self, i: usize) -> bool {
        self.visited[i >> 6] & (1 << (i & 63)) != 0
    }

    #[inline]
    fn mark(&mut self, i: usize) {
        self.visited[i >> 6] |= 1 << (i & 63);
    }
}

#[inline]
fn decompose(i: usize) -> (usize, usize, usize) {
    (i & 15, i >> 8, (i >> 4) & 15)
}

/// Faces of the chunk a boundary cell lies on, as a 6-bit set.
#[inline]
fn touched_faces(x: usize, y: usize, z: usize) -> u8 {
    let mut set = 0u8;
    if y == 0 {
        set |= 1 << Face::NegY.index();
    }
    if y == S - 1 {
        set |= 1 << Face::PosY.index();
    }
    if z == 0 {
        set |= 1 << Face::NegZ.index();
    }
    if z == S - 1 {
        set |= 1 << Face::PosZ.index();
    }
    if x == 0 {
        set |= 1 << Face::NegX.index();
    }
    if x == S - 1 {
        set |= 1 << Face::PosX.index();
    }
    set
}

/// Computes the 15-bit face-pair mask of a chunk: bit `i` is set when the
/// two faces of pair `i` are linked by a path of non-opaque cells.
///
/// Fills are seeded from every non-opaque cell on each of the six faces, so
/// boundary pockets connect to all the faces they touch. Uniform chunks
/// short-circuit: all-open when non-opaque, zero when opaque. Unloaded
/// chunks conduct fully.
pub fn compute_connected_faces(
    chunk: &PaletteChunk,
    reg: &BlockRegistry,
    scratch: &mut FloodScratch,
) -> u16 {
    if !chunk.is_loaded() {
        return ALL_FACE_PAIRS;
    }
    if let Some(t) = chunk.uniform_block() {
        return if reg.is_opaque(t) { 0 } else { ALL_FACE_PAIRS };
    }

    let blocks = chunk.blocks().expect("multi-palette chunk is dense");
    // Per-palette-slot opacity, resolved once.
    let mut opaque_slot = [false; 256];
    for (i, &t) in chunk.palette().iter().enumerate() {
        opaque_slot[i] = reg.is_opaque(t);
    }

    scratch.clear();
    let mut mask = 0u16;

    for seed in (0..CHUNK_VOLUME).filter(|&i| {
        let (x, y, z) = decompose(i);
        touched_faces(x, y, z) != 0
    }) {
        if scratch.is_visited(seed) || opaque_slot[blocks[seed] as usize] {
            continue;
        }
        // Breadth-first fill of one open region, tracking touched faces.
        scratch.queue.clear();
        scratch.queue.push(seed as u16);
        scratch.mark(seed);
        let mut face_set = 0u8;
        let mut head = 0usize;
        while head < scratch.queue.len() {
            let cell = scratch.queue[head] as usize;
            head += 1;
            let (x, y, z) = decompose(cell);
            face_set |= touched_faces(x, y, z);
            for face in Face::ALL {
                let (dx, dy, dz) = face.delta();
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                let nz = z as i32 + dz;
                if nx < 0 || ny < 0 || nz < 0 {
                    continue;
                }
                let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
                if nx >= S || ny >= S || nz >= S {
                    continue;
                }
                let ni = (ny * S + nz) * S + nx;
                if !scratch.is_visited(ni) && !opaque_slot[blocks[ni] as usize] {
                    scratch.mark(ni);
                    scratch.queue.push(ni as u16);
                }
            }
        }
        mask |= face_set_to_pair_mask(face_set);
        if mask == ALL_FACE_PAIRS {
            break;
        }
    }
    mask
}
