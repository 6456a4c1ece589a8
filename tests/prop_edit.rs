use proptest::prelude::*;
use strata::edit::apply_box_edit;
use strata::{ChunkCoord, ChunkStore, AIR, STONE};

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

fn coord_in_world() -> impl Strategy<Value = i32> {
    -28i32..24
}

fn box_size() -> impl Strategy<Value = i32> {
    0i32..24
}

proptest! {
    // Every cell of the clamped box reads back the written type, cells
    // outside stay air, and the palette invariants hold throughout.
    #[test]
    fn boxes_write_exactly_their_cells(
        mx in coord_in_world(), my in coord_in_world(), mz in coord_in_world(),
        sx in box_size(), sy in box_size(), sz in box_size(),
    ) {
        let mut store = air_world(2);
        let report = apply_box_edit(&mut store, [mx, my, mz], [sx, sy, sz], STONE).unwrap();

        for (_, chunk) in store.iter() {
            prop_assert!(chunk.invariants_ok());
        }
        // Sample the box interior and a shell around it.
        for x in (mx - 2)..(mx + sx + 2) {
            for y in (my - 2)..(my + sy + 2) {
                for z in (mz - 2)..(mz + sz + 2) {
                    let Some(got) = store.block_at(x, y, z) else {
                        // Outside the loaded world.
                        continue;
                    };
                    let inside = x >= mx && x < mx + sx
                        && y >= my && y < my + sy
                        && z >= mz && z < mz + sz;
                    prop_assert_eq!(got, if inside { STONE } else { AIR }, "at {},{},{}", x, y, z);
                }
            }
        }
        let volume = (sx as i64) * (sy as i64) * (sz as i64);
        prop_assert_eq!(report.any_modified(), volume > 0);
    }

    // Repeating an edit leaves the store byte-identical.
    #[test]
    fn edits_are_idempotent(
        mx in coord_in_world(), my in coord_in_world(), mz in coord_in_world(),
        sx in box_size(), sy in box_size(), sz in box_size(),
    ) {
        let mut store = air_world(2);
        apply_box_edit(&mut store, [mx, my, mz], [sx, sy, sz], STONE).unwrap();
        let snapshot = |store: &ChunkStore| {
            let mut v: Vec<_> = store
                .iter()
                .map(|(c, ch)| (*c, ch.palette().to_vec(), ch.blocks().map(<[u8]>::to_vec)))
                .collect();
            v.sort_by_key(|(c, _, _)| (c.cx, c.cy, c.cz));
            v
        };
        let first = snapshot(&store);
        apply_box_edit(&mut store, [mx, my, mz], [sx, sy, sz], STONE).unwrap();
        prop_assert_eq!(first, snapshot(&store));
    }
}
