use serde::{Deserialize, Serialize};

/// Blocks per chunk edge.
pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_SIZE_I: i32 = CHUNK_SIZE as i32;
/// Blocks per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Integer division rounding toward positive infinity, correct for negatives.
#[inline]
pub fn ceil_div(a: i32, s: i32) -> i32 {
    a.div_euclid(s) + if a.rem_euclid(s) != 0 { 1 } else { 0 }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    /// Chunk containing the block coordinate (floor divide).
    #[inline]
    pub fn containing(wx: i32, wy: i32, wz: i32) -> Self {
        Self {
            cx: wx.div_euclid(CHUNK_SIZE_I),
            cy: wy.div_euclid(CHUNK_SIZE_I),
            cz: wz.div_euclid(CHUNK_SIZE_I),
        }
    }

    /// Chunk-grid coordinate of the block coordinate, rounded up per axis.
    #[inline]
    pub fn ceil_of(wx: i32, wy: i32, wz: i32) -> Self {
        Self {
            cx: ceil_div(wx, CHUNK_SIZE_I),
            cy: ceil_div(wy, CHUNK_SIZE_I),
            cz: ceil_div(wz, CHUNK_SIZE_I),
        }
    }

    /// Block-space origin of this chunk.
    #[inline]
    pub fn origin(self) -> (i32, i32, i32) {
        (
            self.cx * CHUNK_SIZE_I,
            self.cy * CHUNK_SIZE_I,
            self.cz * CHUNK_SIZE_I,
        )
    }

    /// Local coordinates of a block inside this chunk.
    /// The block must lie within the chunk's extents.
    #[inline]
    pub fn local_of(self, wx: i32, wy: i32, wz: i32) -> (usize, usize, usize) {
        let (ox, oy, oz) = self.origin();
        debug_assert!(wx >= ox && wx < ox + CHUNK_SIZE_I);
        debug_assert!(wy >= oy && wy < oy + CHUNK_SIZE_I);
        debug_assert!(wz >= oz && wz < oz + CHUNK_SIZE_I);
        ((wx - ox) as usize, (wy - oy) as usize, (wz - oz) as usize)
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

/// Linear address of a local block coordinate: `y*S*S + z*S + x`.
#[inline]
pub fn linear_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE);
    (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_coords() {
        assert_eq!(ChunkCoord::containing(0, 0, 0), ChunkCoord::new(0, 0, 0));
        assert_eq!(ChunkCoord::containing(15, 15, 15), ChunkCoord::new(0, 0, 0));
        assert_eq!(
            ChunkCoord::containing(-1, -16, -17),
            ChunkCoord::new(-1, -1, -2)
        );
    }

    #[test]
    fn ceil_of_rounds_up() {
        assert_eq!(ChunkCoord::ceil_of(0, 0, 0), ChunkCoord::new(0, 0, 0));
        assert_eq!(ChunkCoord::ceil_of(1, 16, 17), ChunkCoord::new(1, 1, 2));
        assert_eq!(ChunkCoord::ceil_of(-1, -16, -17), ChunkCoord::new(0, -1, -1));
    }

    #[test]
    fn local_of_inverts_origin() {
        let c = ChunkCoord::new(-2, 3, 0);
        let (ox, oy, oz) = c.origin();
        assert_eq!(c.local_of(ox, oy, oz), (0, 0, 0));
        assert_eq!(c.local_of(ox + 15, oy + 1, oz + 7), (15, 1, 7));
    }
}
