use strata_blocks::BlockId;
use strata_chunk::{ChunkCoord, ChunkStore, Face, CHUNK_SIZE_I};

use crate::error::EngineError;

/// Outcome of a box edit: which chunks changed and which neighbors need a
/// remesh because the edit touched their shared boundary.
#[derive(Debug, Default)]
pub struct EditReport {
    pub modified: Vec<ChunkCoord>,
    pub remesh_neighbors: Vec<ChunkCoord>,
    pub skipped_unloaded: usize,
}

impl EditReport {
    #[inline]
    pub fn any_modified(&self) -> bool {
        !self.modified.is_empty()
    }
}

/// Writes `t` into the axis-aligned box `[box_min, box_min + box_size)`.
///
/// Chunks fully covered by the box collapse to a single-entry palette;
/// partially covered chunks grow their palette and dense array as needed.
/// Unloaded chunks in the span are logged and skipped, leaving the edit
/// partial but coherent. Negative sizes are a programmer error; zero sizes
/// are a no-op.
///
/// Every modified chunk has `connected_faces` invalidated; recomputing the
/// mask from the new contents is the caller's job (the engine does this for
/// each reported chunk when culling is enabled).
pub fn apply_box_edit(
    store: &mut ChunkStore,
    box_min: [i32; 3],
    box_size: [i32; 3],
    t: BlockId,
) -> Result<EditReport, EngineError> {
    if box_size.iter().any(|&s| s < 0) {
        return Err(EngineError::InvalidEditBox(box_size));
    }
    let mut report = EditReport::default();
    if box_size.iter().any(|&s| s == 0) {
        return Ok(report);
    }
    let box_max = [
        box_min[0] + box_size[0],
        box_min[1] + box_size[1],
        box_min[2] + box_size[2],
    ];

    let c0 = ChunkCoord::containing(box_min[0], box_min[1], box_min[2]);
    let c1 = ChunkCoord::ceil_of(box_max[0], box_max[1], box_max[2]);

    for cy in c0.cy..c1.cy {
        for cz in c0.cz..c1.cz {
            for cx in c0.cx..c1.cx {
                let coord = ChunkCoord::new(cx, cy, cz);
                let Some(chunk) = store.get_mut(coord) else {
                    report.skipped_unloaded += 1;
                    continue;
                };
                if !chunk.is_loaded() {
                    report.skipped_unloaded += 1;
                    continue;
                }

                // Clamp the box to this chunk's local extents.
                let (ox, oy, oz) = coord.origin();
                let lx0 = (box_min[0] - ox).max(0);
                let ly0 = (box_min[1] - oy).max(0);
                let lz0 = (box_min[2] - oz).max(0);
                let lx1 = (box_max[0] - ox).min(CHUNK_SIZE_I);
                let ly1 = (box_max[1] - oy).min(CHUNK_SIZE_I);
                let lz1 = (box_max[2] - oz).min(CHUNK_SIZE_I);

                let full_cover = lx0 == 0
                    && ly0 == 0
                    && lz0 == 0
                    && lx1 == CHUNK_SIZE_I
                    && ly1 == CHUNK_SIZE_I
                    && lz1 == CHUNK_SIZE_I;

                // A chunk already uniform in `t` has nothing to change.
                if chunk.uniform_block() == Some(t) {
                    continue;
                }
                if full_cover {
                    chunk.set_single_palette(t);
                } else {
                    chunk.ensure_dense();
                    let idx = match chunk.add_to_palette(t) {
                        Some(idx) => idx,
                        None => {
                            // Renumber out unused entries, then retry once.
                            chunk.compact();
                            match chunk.add_to_palette(t) {
                                Some(idx) => idx,
                                None => {
                                    log::warn!(
                                        "palette full at {coord:?}; skipping chunk in edit"
                                    );
                                    continue;
                                }
                            }
                        }
                    };
                    for ly in ly0..ly1 {
                        for lz in lz0..lz1 {
                            for lx in lx0..lx1 {
                                chunk.set_block_index(
                                    lx as usize,
                                    ly as usize,
                                    lz as usize,
                                    idx,
                                );
                            }
                        }
                    }
                    chunk.collapse_if_uniform();
                }
                chunk.mark_connectivity_dirty();
                report.modified.push(coord);

                // Neighbors whose shared boundary the edit touches.
                if lx0 == 0 {
                    report.remesh_neighbors.push(coord.neighbor(Face::NegX));
                }
                if lx1 == CHUNK_SIZE_I {
                    report.remesh_neighbors.push(coord.neighbor(Face::PosX));
                }
                if ly0 == 0 {
                    report.remesh_neighbors.push(coord.neighbor(Face::NegY));
                }
                if ly1 == CHUNK_SIZE_I {
                    report.remesh_neighbors.push(coord.neighbor(Face::PosY));
                }
                if lz0 == 0 {
                    report.remesh_neighbors.push(coord.neighbor(Face::NegZ));
                }
                if lz1 == CHUNK_SIZE_I {
                    report.remesh_neighbors.push(coord.neighbor(Face::PosZ));
                }
            }
        }
    }

    if report.skipped_unloaded > 0 {
        log::info!(
            "box edit skipped {} unloaded chunk(s) in span",
            report.skipped_unloaded
        );
    }
    // Chunks inside the span never need a neighbor-triggered remesh; they
    // are remeshed as modified chunks.
    report
        .remesh_neighbors
        .retain(|c| !report.modified.contains(c));
    report.remesh_neighbors.sort_by_key(|c| (c.cx, c.cy, c.cz));
    report.remesh_neighbors.dedup();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::{AIR, STONE};
    use strata_chunk::CHUNK_VOLUME;

    fn air_world(radius: i32) -> ChunkStore {
        let mut store = ChunkStore::new();
        for cx in -radius..radius {
            for cy in -radius..radius {
                for cz in -radius..radius {
                    store
                        .get_or_insert_unloaded(ChunkCoord::new(cx, cy, cz))
                        .set_single_palette(AIR);
                }
            }
        }
        store
    }

    #[test]
    fn negative_size_is_a_programmer_error() {
        let mut store = air_world(1);
        let err = apply_box_edit(&mut store, [0, 0, 0], [1, -1, 1], STONE);
        assert!(matches!(err, Err(EngineError::InvalidEditBox(_))));
    }

    #[test]
    fn zero_size_is_a_noop() {
        let mut store = air_world(1);
        let report = apply_box_edit(&mut store, [0, 0, 0], [0, 4, 4], STONE).unwrap();
        assert!(!report.any_modified());
    }

    #[test]
    fn single_block_edit_grows_one_palette() {
        let mut store = air_world(1);
        let report = apply_box_edit(&mut store, [0, 0, 0], [1, 1, 1], STONE).unwrap();
        assert_eq!(report.modified, vec![ChunkCoord::new(0, 0, 0)]);
        let chunk = store.get(ChunkCoord::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.palette(), &[AIR, STONE]);
        assert_eq!(chunk.get_block(0, 0, 0), STONE);
        assert_eq!(chunk.get_block(1, 0, 0), AIR);
        assert!(chunk.invariants_ok());
        // The edit sits in the chunk's corner: three neighbors share it.
        assert_eq!(report.remesh_neighbors.len(), 3);
    }

    #[test]
    fn full_cover_collapses_to_single_palette() {
        let mut store = air_world(1);
        apply_box_edit(&mut store, [0, 0, 0], [1, 1, 1], STONE).unwrap();
        let report = apply_box_edit(&mut store, [0, 0, 0], [16, 16, 16], STONE).unwrap();
        assert!(report.any_modified());
        let chunk = store.get(ChunkCoord::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.palette(), &[STONE]);
        assert!(chunk.blocks().is_none());
        // All six neighbors touch the overwritten boundary.
        assert_eq!(report.remesh_neighbors.len(), 6);
    }

    #[test]
    fn partial_writes_that_fill_the_chunk_collapse_too() {
        let mut store = air_world(1);
        // Two half-chunk edits that together tile chunk (0,0,0).
        apply_box_edit(&mut store, [0, 0, 0], [16, 8, 16], STONE).unwrap();
        apply_box_edit(&mut store, [0, 8, 0], [16, 8, 16], STONE).unwrap();
        let chunk = store.get(ChunkCoord::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.palette(), &[STONE]);
        assert!(chunk.blocks().is_none());
    }

    #[test]
    fn spanning_edit_touches_every_chunk_in_range() {
        let mut store = air_world(2);
        // 4 blocks centered on the origin corner: spans 8 chunks.
        let report = apply_box_edit(&mut store, [-2, -2, -2], [4, 4, 4], STONE).unwrap();
        assert_eq!(report.modified.len(), 8);
        for c in &report.modified {
            let chunk = store.get(*c).unwrap();
            assert_eq!(chunk.palette(), &[AIR, STONE]);
            assert!(chunk.invariants_ok());
        }
        assert_eq!(store.block_at(-1, -1, -1), Some(STONE));
        assert_eq!(store.block_at(1, 1, 1), Some(STONE));
        assert_eq!(store.block_at(2, 0, 0), Some(AIR));
    }

    #[test]
    fn unloaded_chunks_are_skipped_coherently() {
        let mut store = ChunkStore::new();
        store
            .get_or_insert_unloaded(ChunkCoord::new(0, 0, 0))
            .set_single_palette(AIR);
        // Chunk (1,0,0) exists but was never filled.
        store.get_or_insert_unloaded(ChunkCoord::new(1, 0, 0));
        let report = apply_box_edit(&mut store, [8, 0, 0], [16, 1, 1], STONE).unwrap();
        assert_eq!(report.modified, vec![ChunkCoord::new(0, 0, 0)]);
        assert_eq!(report.skipped_unloaded, 1);
        assert!(report.any_modified());
        assert_eq!(store.block_at(8, 0, 0), Some(STONE));
        assert!(!store.get(ChunkCoord::new(1, 0, 0)).unwrap().is_loaded());
    }

    #[test]
    fn idempotent_edits_leave_storage_identical() {
        let mut store = air_world(1);
        let snapshot = |store: &ChunkStore| -> Vec<(ChunkCoord, Vec<u16>, Option<Vec<u8>>)> {
            let mut v: Vec<_> = store
                .iter()
                .map(|(c, ch)| {
                    (
                        *c,
                        ch.palette().to_vec(),
                        ch.blocks().map(|b| b.to_vec()),
                    )
                })
                .collect();
            v.sort_by_key(|(c, _, _)| (c.cx, c.cy, c.cz));
            v
        };
        apply_box_edit(&mut store, [3, 3, 3], [5, 2, 9], STONE).unwrap();
        let first = snapshot(&store);
        apply_box_edit(&mut store, [3, 3, 3], [5, 2, 9], STONE).unwrap();
        let second = snapshot(&store);
        assert_eq!(first, second);
    }

    #[test]
    fn query_returns_the_written_type_everywhere_in_the_box() {
        let mut store = air_world(1);
        let min = [2, 5, 7];
        let size = [6, 3, 4];
        apply_box_edit(&mut store, min, size, STONE).unwrap();
        for y in min[1]..min[1] + size[1] {
            for z in min[2]..min[2] + size[2] {
                for x in min[0]..min[0] + size[0] {
                    assert_eq!(store.block_at(x, y, z), Some(STONE));
                }
            }
        }
    }
}
