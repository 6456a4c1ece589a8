use bytemuck::{Pod, Zeroable};
use strata_blocks::AtlasRect;
use strata_chunk::{Face, CHUNK_SIZE};
use strata_geom::{Aabb, Vec3};

/// Unorm position units per block edge: `S` edges span 128 units.
pub const POS_UNITS_PER_BLOCK: u8 = (128 / CHUNK_SIZE) as u8;

/// Fixed-layout vertex: position `4×u8` unorm, normal `4×i8` snorm,
/// uv `2×f32`. 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [u8; 4],
    pub normal: [i8; 4],
    pub uv: [f32; 2],
}

#[inline]
fn snorm_normal(face: Face) -> [i8; 4] {
    let (dx, dy, dz) = face.delta();
    let q = |d: i32| -> i8 {
        match d {
            1 => 127,
            -1 => -128,
            _ => 0,
        }
    };
    [q(dx), q(dy), q(dz), 0]
}

// Per-face unit-cube corner offsets, CCW viewed from outside, indexed by
// the canonical face numbering. UV corner i pairs with AtlasRect::corner(i).
const FACE_CORNERS: [[[u8; 3]; 4]; 6] = [
    // -y
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [0, 0, 1]],
    // +y
    [[0, 1, 0], [0, 1, 1], [1, 1, 1], [1, 1, 0]],
    // -z
    [[0, 0, 0], [0, 1, 0], [1, 1, 0], [1, 0, 0]],
    // +z
    [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]],
    // -x
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [0, 1, 0]],
    // +x
    [[1, 0, 0], [1, 1, 0], [1, 1, 1], [1, 0, 1]],
];

/// Growable vertex/index scratch, reused across chunks on a worker.
#[derive(Default, Clone)]
pub struct MeshBuild {
    pub verts: Vec<PackedVertex>,
    pub idx: Vec<u16>,
}

impl MeshBuild {
    /// Clears both arrays but retains capacity for reuse.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.verts.clear();
        self.idx.clear();
    }

    /// Pre-reserve for approximately `n_quads` faces.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        self.verts.reserve(n_quads * 4);
        self.idx.reserve(n_quads * 6);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.idx.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.idx.len() / 6
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Appends one block face at local cell `(x,y,z)`: four vertices wound
    /// CCW from outside plus triangles `(0,1,2),(2,3,0)`.
    pub fn add_face(&mut self, face: Face, x: usize, y: usize, z: usize, rect: AtlasRect) {
        // Stay within the u16 index space; overflowing chunks drop trailing
        // faces rather than wrapping indices.
        if self.verts.len() + 4 > u16::MAX as usize + 1 {
            return;
        }
        let base = self.verts.len() as u16;
        let normal = snorm_normal(face);
        let corners = &FACE_CORNERS[face.index()];
        for (i, corner) in corners.iter().enumerate() {
            let px = (x as u8 + corner[0]) * POS_UNITS_PER_BLOCK;
            let py = (y as u8 + corner[1]) * POS_UNITS_PER_BLOCK;
            let pz = (z as u8 + corner[2]) * POS_UNITS_PER_BLOCK;
            self.verts.push(PackedVertex {
                position: [px, py, pz, 0],
                normal,
                uv: rect.corner(i),
            });
        }
        self.idx.extend_from_slice(&[
            base,
            base + 1,
            base + 2,
            base + 2,
            base + 3,
            base,
        ]);
    }

    /// Copies the packed bytes into `out`, reusing its allocations.
    pub fn pack_into(&self, out: &mut MeshData) {
        out.vertices.clear();
        out.vertices
            .extend_from_slice(bytemuck::cast_slice(&self.verts));
        out.indices.clear();
        out.indices.extend_from_slice(bytemuck::cast_slice(&self.idx));
        out.vertex_count = self.verts.len() as u32;
        out.index_count = self.idx.len() as u32;
        out.aabb = MeshData::UNIT_AABB;
        out.submesh = SubMesh {
            first_index: 0,
            index_count: self.idx.len() as u32,
            base_vertex: 0,
        };
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubMesh {
    pub first_index: u32,
    pub index_count: u32,
    pub base_vertex: u32,
}

/// Finished mesh resource: the two byte streams plus bounds and submesh.
/// Instances are recycled through the engine's pool by capacity.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<u8>,
    pub indices: Vec<u8>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub aabb: Aabb,
    pub submesh: SubMesh,
}

impl MeshData {
    /// Chunk bounds in unorm vertex space: `[0, 128/255]³`.
    pub const UNIT_AABB: Aabb = Aabb::new(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0),
    );

    /// Combined byte capacity, the pool's recycling key.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.vertices.capacity() + self.indices.capacity()
    }
}
