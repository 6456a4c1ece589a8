use std::collections::VecDeque;

use strata_chunk::{face_has_any_pair, faces_connected, ChunkCoord, ChunkStore, Face, CHUNK_SIZE_I};
use strata_geom::{Aabb, Frustum, Vec3};

use crate::engine::RenderMap;

/// A chunk selected for drawing, with the face the traversal entered it
/// through (for debugging; `None` for the camera chunk).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleChunk {
    pub coord: ChunkCoord,
    pub entered_through: Option<Face>,
}

/// Camera description for the traversal's direction filter.
#[derive(Clone, Copy, Debug)]
pub struct Viewpoint {
    pub eye: Vec3,
    pub forward: Vec3,
    /// Full horizontal field of view, degrees.
    pub fov_deg: f32,
}

const BIT_EMITTED: u8 = 1 << 0;
const BIT_FRUSTUM: u8 = 1 << 1;
// Safety cap on dequeues.
const MAX_ITERATIONS: usize = 64 * 64 * 64;

#[inline]
fn traversed_bit(face: Face) -> u8 {
    1 << (2 + face.index())
}

#[inline]
fn chunk_aabb(coord: ChunkCoord) -> Aabb {
    let (ox, oy, oz) = coord.origin();
    let min = Vec3::new(ox as f32, oy as f32, oz as f32);
    let s = CHUNK_SIZE_I as f32;
    Aabb::new(min, min + Vec3::new(s, s, s))
}

/// Chunk-visibility BFS from the camera chunk.
///
/// Traversal steps only through faces passing the direction filter
/// `n·forward >= cos(min(90° + ⅔·fov, 180°))`, only between faces linked in
/// each chunk's connectivity mask, and only into chunks inside the `(2V)³`
/// status grid that pass the frustum test. Chunks with a renderable mesh are
/// emitted in BFS order.
pub fn traverse_visible(
    store: &ChunkStore,
    renders: &RenderMap,
    view: &Viewpoint,
    frustum: &Frustum,
    view_distance: i32,
    out: &mut Vec<VisibleChunk>,
) {
    out.clear();
    let v = view_distance.max(1);
    let grid = (2 * v) as usize;
    let mut status = vec![0u8; grid * grid * grid];
    // Offsets live in [-v, v); the camera chunk sits at offset zero.
    let index_of = |c: ChunkCoord, c0: ChunkCoord| -> Option<usize> {
        let dx = c.cx - c0.cx;
        let dy = c.cy - c0.cy;
        let dz = c.cz - c0.cz;
        if dx < -v || dx >= v || dy < -v || dy >= v || dz < -v || dz >= v {
            return None;
        }
        let ix = (dx + v) as usize;
        let iy = (dy + v) as usize;
        let iz = (dz + v) as usize;
        Some((iz * grid + iy) * grid + ix)
    };

    let fwd = view.forward.normalized();
    let limit = (90.0 + view.fov_deg * 2.0 / 3.0).min(180.0).to_radians().cos();
    let mut valid_dirs = [false; 6];
    for face in Face::ALL {
        let n = face.normal_f32();
        let dot = n[0] * fwd.x + n[1] * fwd.y + n[2] * fwd.z;
        valid_dirs[face.index()] = dot >= limit;
    }

    let c0 = ChunkCoord::containing(
        view.eye.x.floor() as i32,
        view.eye.y.floor() as i32,
        view.eye.z.floor() as i32,
    );
    let seed_idx = index_of(c0, c0).expect("camera chunk is inside its own grid");
    status[seed_idx] |= BIT_FRUSTUM;

    let mut queue: VecDeque<(ChunkCoord, Option<Face>)> = VecDeque::new();
    queue.push_back((c0, None));

    let mut iterations = 0usize;
    while let Some((coord, came_from)) = queue.pop_front() {
        iterations += 1;
        if iterations > MAX_ITERATIONS || out.len() >= status.len() {
            break;
        }
        let Some(idx) = index_of(coord, c0) else {
            continue;
        };
        if status[idx] & BIT_EMITTED == 0 && renders.contains_key(&coord) {
            status[idx] |= BIT_EMITTED;
            out.push(VisibleChunk {
                coord,
                entered_through: came_from,
            });
        }

        // Absent or invalidated chunks conduct on every pair.
        let mask = store
            .get(coord)
            .map_or(strata_chunk::ALL_FACE_PAIRS, |c| c.connectivity_mask());

        for face in Face::ALL {
            if !valid_dirs[face.index()] {
                continue;
            }
            match came_from {
                // Entering face and exit face must be linked inside this chunk.
                Some(from) => {
                    if !faces_connected(mask, from, face) {
                        continue;
                    }
                }
                // From the camera chunk, an exit face must reach something.
                None => {
                    if !face_has_any_pair(mask, face) {
                        continue;
                    }
                }
            }
            let neighbor = coord.neighbor(face);
            let Some(nidx) = index_of(neighbor, c0) else {
                continue;
            };
            if status[nidx] & traversed_bit(face) != 0 {
                continue;
            }
            status[nidx] |= traversed_bit(face);
            if status[nidx] & BIT_FRUSTUM == 0 {
                if !frustum.intersects_aabb(chunk_aabb(neighbor)) {
                    continue;
                }
                status[nidx] |= BIT_FRUSTUM;
            }
            queue.push_back((neighbor, Some(face.opposite())));
        }
    }
}
