use serde::Deserialize;

/// Nonnegative integer identifying a material.
pub type BlockId = u16;

/// Reserved id: neither solid nor opaque.
pub const AIR: BlockId = 0;
/// Reserved id: solid and opaque.
pub const STONE: BlockId = 1;

/// Normalized sub-rectangle of the texture atlas for one block face.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct AtlasRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl AtlasRect {
    pub const FULL: AtlasRect = AtlasRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    /// UV for quad corner `i` in the face winding order:
    /// 0 = (u0,v0), 1 = (u1,v0), 2 = (u1,v1), 3 = (u0,v1).
    #[inline]
    pub fn corner(&self, i: usize) -> [f32; 2] {
        match i & 3 {
            0 => [self.u0, self.v0],
            1 => [self.u1, self.v0],
            2 => [self.u1, self.v1],
            _ => [self.u0, self.v1],
        }
    }
}

impl Default for AtlasRect {
    fn default() -> Self {
        Self::FULL
    }
}
