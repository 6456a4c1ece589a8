use proptest::prelude::*;
use strata_blocks::{BlockId, AIR};
use strata_chunk::{ceil_div, linear_index, ChunkCoord, PaletteChunk, CHUNK_SIZE, CHUNK_VOLUME};

fn small_i32() -> impl Strategy<Value = i32> {
    -1_000_000i32..=1_000_000
}

fn local_coord() -> impl Strategy<Value = (usize, usize, usize)> {
    (0..CHUNK_SIZE, 0..CHUNK_SIZE, 0..CHUNK_SIZE)
}

// linear_index maps each (x,y,z) within bounds to unique in-range addresses
#[test]
fn linear_index_is_unique_and_in_range() {
    let mut seen = vec![false; CHUNK_VOLUME];
    for y in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let i = linear_index(x, y, z);
                assert!(i < CHUNK_VOLUME);
                assert!(!seen[i]);
                seen[i] = true;
            }
        }
    }
    assert!(seen.into_iter().all(|b| b));
}

proptest! {
    // floor/ceil/local helpers agree for any block coordinate
    #[test]
    fn coord_helpers_agree(wx in small_i32(), wy in small_i32(), wz in small_i32()) {
        let c = ChunkCoord::containing(wx, wy, wz);
        let (ox, oy, oz) = c.origin();
        prop_assert!(wx >= ox && wx < ox + 16);
        prop_assert!(wy >= oy && wy < oy + 16);
        prop_assert!(wz >= oz && wz < oz + 16);
        let (lx, ly, lz) = c.local_of(wx, wy, wz);
        prop_assert_eq!((ox + lx as i32, oy + ly as i32, oz + lz as i32), (wx, wy, wz));
    }

    // ceil_div is the least q with q*s >= a
    #[test]
    fn ceil_div_is_least_upper(a in small_i32(), s in 1i32..64) {
        let q = ceil_div(a, s);
        prop_assert!(q * s >= a);
        prop_assert!((q - 1) * s < a);
    }

    // A random write sequence keeps the palette invariants and matches a
    // dense shadow model.
    #[test]
    fn palette_writes_match_shadow(
        writes in proptest::collection::vec((local_coord(), 0u16..6), 0..200),
        base in 0u16..6,
    ) {
        let mut chunk = PaletteChunk::unloaded(ChunkCoord::new(0, 0, 0));
        chunk.set_single_palette(base);
        let mut shadow = vec![base; CHUNK_VOLUME];

        for ((x, y, z), t) in writes {
            if chunk.uniform_block() == Some(t) {
                // Nothing to do; the write is a no-op on a uniform chunk.
            } else {
                chunk.ensure_dense();
                let idx = chunk.add_to_palette(t).expect("palette cannot fill here");
                chunk.set_block_index(x, y, z, idx);
            }
            shadow[linear_index(x, y, z)] = t;
            prop_assert!(chunk.invariants_ok());
        }

        for y in 0..CHUNK_SIZE { for z in 0..CHUNK_SIZE { for x in 0..CHUNK_SIZE {
            prop_assert_eq!(
                chunk.get_block(x, y, z),
                shadow[linear_index(x, y, z)]
            );
        }}}
    }

    // collapse_if_uniform never changes observable contents
    #[test]
    fn collapse_preserves_contents(t in 0u16..6, cells in proptest::collection::vec(local_coord(), 1..30)) {
        let mut chunk = PaletteChunk::unloaded(ChunkCoord::new(0, 0, 0));
        chunk.set_single_palette(AIR);
        chunk.ensure_dense();
        let idx = chunk.add_to_palette(t).unwrap();
        for (x, y, z) in &cells {
            chunk.set_block_index(*x, *y, *z, idx);
        }
        let before: Vec<BlockId> = (0..CHUNK_VOLUME).map(|i| chunk.get_block_linear(i)).collect();
        chunk.collapse_if_uniform();
        let after: Vec<BlockId> = (0..CHUNK_VOLUME).map(|i| chunk.get_block_linear(i)).collect();
        prop_assert_eq!(before, after);
        prop_assert!(chunk.invariants_ok());
    }

    // compact drops dead entries without changing observable contents
    #[test]
    fn compact_preserves_contents(
        writes in proptest::collection::vec((local_coord(), 0u16..8), 1..60),
    ) {
        let mut chunk = PaletteChunk::unloaded(ChunkCoord::new(0, 0, 0));
        chunk.set_single_palette(AIR);
        chunk.ensure_dense();
        for ((x, y, z), t) in writes {
            let idx = chunk.add_to_palette(t).unwrap();
            chunk.set_block_index(x, y, z, idx);
        }
        let before: Vec<BlockId> = (0..CHUNK_VOLUME).map(|i| chunk.get_block_linear(i)).collect();
        chunk.compact();
        let after: Vec<BlockId> = (0..CHUNK_VOLUME).map(|i| chunk.get_block_linear(i)).collect();
        prop_assert_eq!(before, after);
        prop_assert!(chunk.invariants_ok());
        // Every remaining palette entry is referenced (or the chunk is uniform).
        if let Some(blocks) = chunk.blocks() {
            let mut used = vec![false; chunk.palette().len()];
            for &b in blocks { used[b as usize] = true; }
            prop_assert!(used.into_iter().all(|u| u));
        }
    }
}
