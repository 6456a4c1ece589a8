use strata_blocks::{BlockId, BlockRegistry, AIR};
use strata_chunk::{ChunkCoord, ChunkStore, CHUNK_SIZE_I};
use strata_geom::Vec3;

/// Result of a successful raycast: the solid block hit, the ray parameter at
/// entry, the entry position clamped just inside the exited cell, and the
/// normal of the face the ray came through.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub block: BlockId,
    pub distance: f32,
    pub position: Vec3,
    pub normal: Vec3,
}

const MAX_STEPS: usize = 1024;
// Nudge applied when sampling the cell at parameter t, so a point sitting
// exactly on a cell boundary lands in the cell the ray is entering.
const STEP_EPS: f32 = 1e-4;

#[derive(Clone, Copy)]
struct CellBox {
    min: Vec3,
    max: Vec3,
}

/// DDA traversal over the sparse chunk grid.
///
/// Absent or unloaded chunks are skipped in one step across the whole chunk
/// box and read as air; uniform chunks are likewise consumed whole with
/// their single block type; dense chunks step one block at a time.
pub fn raycast(
    store: &ChunkStore,
    reg: &BlockRegistry,
    origin: Vec3,
    dir: Vec3,
    max_dist: f32,
) -> Option<RayHit> {
    let len = dir.length();
    if len < 1e-6 {
        return None;
    }
    let d = dir / len;

    let mut t = 0.0f32;
    let mut normal = Vec3::ZERO;
    let mut exited: Option<CellBox> = None;

    for _ in 0..MAX_STEPS {
        if t > max_dist {
            return None;
        }
        let sample = origin + d * (t + STEP_EPS);
        let bx = sample.x.floor() as i32;
        let by = sample.y.floor() as i32;
        let bz = sample.z.floor() as i32;
        let coord = ChunkCoord::containing(bx, by, bz);

        // The cell consumed this step: one block inside a dense chunk, the
        // entire chunk box when it is absent, unloaded, or uniform.
        let (cell, block) = match store.get(coord) {
            Some(chunk) if chunk.is_loaded() => match chunk.uniform_block() {
                Some(u) => (chunk_box(coord), u),
                None => {
                    let (lx, ly, lz) = coord.local_of(bx, by, bz);
                    (block_box(bx, by, bz), chunk.get_block(lx, ly, lz))
                }
            },
            _ => (chunk_box(coord), AIR),
        };

        if block != AIR && reg.is_solid(block) {
            let raw = origin + d * t;
            let clamp_into = exited.unwrap_or(cell);
            return Some(RayHit {
                block,
                distance: t,
                position: clamp_inside(raw, clamp_into),
                normal,
            });
        }

        // Side distances to the three potential exit faces of the cell;
        // advance to the nearest and note the exited axis.
        let mut t_exit = f32::MAX;
        let mut exit_normal = Vec3::ZERO;
        for axis in 0..3 {
            let (dc, oc, min_c, max_c) = match axis {
                0 => (d.x, origin.x, cell.min.x, cell.max.x),
                1 => (d.y, origin.y, cell.min.y, cell.max.y),
                _ => (d.z, origin.z, cell.min.z, cell.max.z),
            };
            let side = if dc > 0.0 {
                (max_c - oc) / dc
            } else if dc < 0.0 {
                (min_c - oc) / dc
            } else {
                continue;
            };
            if side < t_exit {
                t_exit = side;
                let sign = if dc > 0.0 { -1.0 } else { 1.0 };
                exit_normal = match axis {
                    0 => Vec3::new(sign, 0.0, 0.0),
                    1 => Vec3::new(0.0, sign, 0.0),
                    _ => Vec3::new(0.0, 0.0, sign),
                };
            }
        }
        if t_exit == f32::MAX || t_exit <= t {
            // Degenerate ray; bail rather than loop in place.
            return None;
        }
        exited = Some(cell);
        normal = exit_normal;
        t = t_exit;
    }
    None
}

#[inline]
fn chunk_box(coord: ChunkCoord) -> CellBox {
    let (ox, oy, oz) = coord.origin();
    let min = Vec3::new(ox as f32, oy as f32, oz as f32);
    let s = CHUNK_SIZE_I as f32;
    CellBox {
        min,
        max: min + Vec3::new(s, s, s),
    }
}

#[inline]
fn block_box(bx: i32, by: i32, bz: i32) -> CellBox {
    let min = Vec3::new(bx as f32, by as f32, bz as f32);
    CellBox {
        min,
        max: min + Vec3::new(1.0, 1.0, 1.0),
    }
}

/// Clamps a boundary point into the cell the ray is leaving, stepping the
/// upper bound down one representable float so the result never reads as the
/// next cell.
#[inline]
fn clamp_inside(p: Vec3, cell: CellBox) -> Vec3 {
    Vec3::new(
        p.x.clamp(cell.min.x, cell.max.x.next_down()),
        p.y.clamp(cell.min.y, cell.max.y.next_down()),
        p.z.clamp(cell.min.z, cell.max.z.next_down()),
    )
}
