use strata_blocks::{BlockRegistry, AIR};
use strata_chunk::{Face, PaletteChunk, CHUNK_SIZE};

use crate::mesh_build::MeshBuild;

const S: i32 = CHUNK_SIZE as i32;

/// Resolves whether the block one step out of `face` from local `(x,y,z)` is
/// opaque. Steps that leave the chunk consult the neighbor across that face;
/// an absent (or not yet filled) neighbor is transparent when
/// `add_border_walls` is set and opaque otherwise.
fn neighbor_opaque(
    chunk: &PaletteChunk,
    neighbors: &[Option<&PaletteChunk>; 6],
    reg: &BlockRegistry,
    add_border_walls: bool,
    x: usize,
    y: usize,
    z: usize,
    face: Face,
) -> bool {
    let (dx, dy, dz) = face.delta();
    let nx = x as i32 + dx;
    let ny = y as i32 + dy;
    let nz = z as i32 + dz;
    if (0..S).contains(&nx) && (0..S).contains(&ny) && (0..S).contains(&nz) {
        return reg.is_opaque(chunk.get_block(nx as usize, ny as usize, nz as usize));
    }
    match neighbors[face.index()] {
        Some(nb) if nb.is_loaded() => {
            let wx = nx.rem_euclid(S) as usize;
            let wy = ny.rem_euclid(S) as usize;
            let wz = nz.rem_euclid(S) as usize;
            reg.is_opaque(nb.get_block(wx, wy, wz))
        }
        _ => !add_border_walls,
    }
}

/// Emits every visible face of `chunk` into `out`.
///
/// A face is visible when its block is solid and non-air and the block on the
/// other side is non-opaque. Uniform-opaque chunks only walk their six
/// boundary slabs; uniform-air chunks produce nothing.
pub fn build_chunk_mesh(
    chunk: &PaletteChunk,
    neighbors: &[Option<&PaletteChunk>; 6],
    reg: &BlockRegistry,
    add_border_walls: bool,
    out: &mut MeshBuild,
) {
    out.clear_keep_capacity();
    if !chunk.is_loaded() {
        return;
    }

    if let Some(t) = chunk.uniform_block() {
        if t == AIR || !reg.is_solid(t) {
            return;
        }
        if reg.is_opaque(t) {
            // Internal faces are all hidden; only the boundary slabs can emit.
            let rect = reg.atlas_rect(t);
            for face in Face::ALL {
                for (x, y, z) in boundary_slab(face) {
                    if !neighbor_opaque(chunk, neighbors, reg, add_border_walls, x, y, z, face) {
                        out.add_face(face, x, y, z, rect);
                    }
                }
            }
            return;
        }
    }

    for y in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let t = chunk.get_block(x, y, z);
                if t == AIR || !reg.is_solid(t) {
                    continue;
                }
                let rect = reg.atlas_rect(t);
                for face in Face::ALL {
                    if !neighbor_opaque(chunk, neighbors, reg, add_border_walls, x, y, z, face) {
                        out.add_face(face, x, y, z, rect);
                    }
                }
            }
        }
    }
}

/// Iterator over the local cells of the boundary slab behind `face`.
fn boundary_slab(face: Face) -> impl Iterator<Item = (usize, usize, usize)> {
    let last = CHUNK_SIZE - 1;
    (0..CHUNK_SIZE * CHUNK_SIZE).map(move |i| {
        let a = i / CHUNK_SIZE;
        let b = i % CHUNK_SIZE;
        match face {
            Face::NegY => (a, 0, b),
            Face::PosY => (a, last, b),
            Face::NegZ => (a, b, 0),
            Face::PosZ => (a, b, last),
            Face::NegX => (0, a, b),
            Face::PosX => (last, a, b),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::{AtlasRect, BlockDef, STONE};
    use strata_chunk::ChunkCoord;

    const NO_NEIGHBORS: [Option<&PaletteChunk>; 6] = [None; 6];

    fn reg() -> BlockRegistry {
        BlockRegistry::with_defaults()
    }

    fn air_chunk() -> PaletteChunk {
        let mut c = PaletteChunk::unloaded(ChunkCoord::new(0, 0, 0));
        c.set_single_palette(AIR);
        c
    }

    fn stone_chunk() -> PaletteChunk {
        let mut c = PaletteChunk::unloaded(ChunkCoord::new(0, 0, 0));
        c.set_single_palette(STONE);
        c
    }

    fn chunk_with_block(x: usize, y: usize, z: usize) -> PaletteChunk {
        let mut c = air_chunk();
        c.ensure_dense();
        let idx = c.add_to_palette(STONE).unwrap();
        c.set_block_index(x, y, z, idx);
        c
    }

    #[test]
    fn uniform_air_emits_nothing() {
        let mut out = MeshBuild::default();
        build_chunk_mesh(&air_chunk(), &NO_NEIGHBORS, &reg(), true, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn lone_center_block_emits_six_faces() {
        let chunk = chunk_with_block(8, 8, 8);
        let mut out = MeshBuild::default();
        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &reg(), false, &mut out);
        assert_eq!(out.face_count(), 6);
        assert_eq!(out.vertex_count(), 24);
        assert_eq!(out.index_count(), 36);
    }

    #[test]
    fn corner_block_against_air_neighbors_emits_six_faces() {
        let chunk = chunk_with_block(0, 0, 0);
        let air_nb = air_chunk();
        let neighbors: [Option<&PaletteChunk>; 6] = [Some(&air_nb); 6];
        let mut out = MeshBuild::default();
        build_chunk_mesh(&chunk, &neighbors, &reg(), false, &mut out);
        assert_eq!(out.face_count(), 6);
    }

    #[test]
    fn corner_block_without_neighbors_respects_border_walls() {
        let chunk = chunk_with_block(0, 0, 0);
        let mut out = MeshBuild::default();
        // Absent neighbors read as opaque: the three outward faces are culled.
        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &reg(), false, &mut out);
        assert_eq!(out.face_count(), 3);
        // Border walls flip them back on.
        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &reg(), true, &mut out);
        assert_eq!(out.face_count(), 6);
    }

    #[test]
    fn border_walls_match_all_air_neighbors() {
        // The same chunk must mesh identically surrounded by nothing (with
        // border walls) and surrounded by air.
        let mut chunk = air_chunk();
        chunk.ensure_dense();
        let idx = chunk.add_to_palette(STONE).unwrap();
        for (x, y, z) in [(0, 0, 0), (15, 3, 9), (7, 15, 0), (4, 4, 4)] {
            chunk.set_block_index(x, y, z, idx);
        }
        let mut walled = MeshBuild::default();
        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &reg(), true, &mut walled);

        let air_nb = air_chunk();
        let neighbors: [Option<&PaletteChunk>; 6] = [Some(&air_nb); 6];
        let mut open = MeshBuild::default();
        build_chunk_mesh(&chunk, &neighbors, &reg(), false, &mut open);

        assert_eq!(walled.verts, open.verts);
        assert_eq!(walled.idx, open.idx);
    }

    #[test]
    fn uniform_stone_boundary_slabs() {
        let chunk = stone_chunk();
        let mut out = MeshBuild::default();
        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &reg(), true, &mut out);
        // All six 16x16 slabs surface against the missing neighbors.
        assert_eq!(out.face_count(), 6 * 256);

        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &reg(), false, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn opaque_neighbors_cull_cross_chunk_faces() {
        let chunk = stone_chunk();
        let stone_nb = stone_chunk();
        let air_nb = air_chunk();
        let mut neighbors: [Option<&PaletteChunk>; 6] = [Some(&stone_nb); 6];
        neighbors[Face::PosY.index()] = Some(&air_nb);
        let mut out = MeshBuild::default();
        build_chunk_mesh(&chunk, &neighbors, &reg(), false, &mut out);
        // Only the +y slab faces the air neighbor.
        assert_eq!(out.face_count(), 256);
        for v in &out.verts {
            assert_eq!(v.normal, [0, 127, 0, 0]);
        }
    }

    #[test]
    fn non_solid_blocks_emit_nothing() {
        let mut registry = reg();
        let mist = registry.register(BlockDef {
            name: "mist".to_string(),
            atlas: AtlasRect::FULL,
            solid: false,
            opaque: false,
        });
        let mut chunk = air_chunk();
        chunk.ensure_dense();
        let idx = chunk.add_to_palette(mist).unwrap();
        chunk.set_block_index(5, 5, 5, idx);
        let mut out = MeshBuild::default();
        build_chunk_mesh(&chunk, &NO_NEIGHBORS, &registry, true, &mut out);
        assert!(out.is_empty());
    }
}
