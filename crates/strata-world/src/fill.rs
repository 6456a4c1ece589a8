use strata_blocks::{AIR, STONE};
use strata_chunk::{linear_index, ChunkCoord, PaletteChunk, CHUNK_SIZE, CHUNK_VOLUME};

use crate::gen::{GenCtx, GenError, GenVariant, Generator};

impl Generator {
    /// Whether the variant's predicate calls a block at `(wx,wy,wz)` solid.
    pub fn is_solid_at(&self, ctx: &GenCtx, wx: i32, wy: i32, wz: i32) -> Result<bool, GenError> {
        let p = &self.params;
        let (x, y, z) = (wx as f32, wy as f32, wz as f32);
        let solid = match self.variant {
            GenVariant::Flat => y + p.offset[1] * p.scale[1] < 0.0,
            GenVariant::Plane => {
                (x + p.offset[0]) * p.scale[0] + (z + p.offset[2]) * p.scale[2]
                    > (y + p.offset[1]) * p.scale[1]
            }
            GenVariant::Simplex2d | GenVariant::Perlin2d => {
                let noise = ctx.noise.as_ref().expect("noise ctx for noise variant");
                let sx = (x + p.offset[0]) * p.scale[0];
                let sz = (z + p.offset[2]) * p.scale[2];
                (noise.get_noise_2d(sx, sz) + p.offset2) * p.scale2 > y
            }
            GenVariant::Simplex3d | GenVariant::Perlin3d => {
                let noise = ctx.noise.as_ref().expect("noise ctx for noise variant");
                let sx = (x + p.offset[0]) * p.scale[0];
                let sy = (y + p.offset[1]) * p.scale[1];
                let sz = (z + p.offset[2]) * p.scale[2];
                (noise.get_noise_3d(sx, sy, sz) + p.offset2) * p.scale2 > y
            }
            GenVariant::CustomTerrain => return Err(GenError::GpuOnlyVariant(self.variant)),
        };
        Ok(solid)
    }

    /// Fills the scratch array with 0/1 bytes and installs the packed result
    /// into `chunk` under the output contract.
    pub fn fill_chunk(
        &self,
        ctx: &mut GenCtx,
        coord: ChunkCoord,
        chunk: &mut PaletteChunk,
    ) -> Result<(), GenError> {
        if !self.variant.cpu_supported() {
            return Err(GenError::GpuOnlyVariant(self.variant));
        }
        debug_assert_eq!(chunk.coord, coord);
        let (ox, oy, oz) = coord.origin();

        ctx.scratch.resize(CHUNK_VOLUME, 0);
        let mut counts = [0usize; 2];
        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let solid =
                        self.is_solid_at(ctx, ox + x as i32, oy + y as i32, oz + z as i32)?;
                    let slot = solid as u8;
                    ctx.scratch[linear_index(x, y, z)] = slot;
                    counts[slot as usize] += 1;
                }
            }
        }
        pack_scratch(chunk, &ctx.scratch, counts);
        Ok(())
    }
}

/// Output contract: a single used slot becomes a uniform palette with no
/// dense storage; two used slots become `[AIR, STONE]` plus a copy of the
/// scratch bytes.
pub fn pack_scratch(chunk: &mut PaletteChunk, scratch: &[u8], counts: [usize; 2]) {
    debug_assert_eq!(counts[0] + counts[1], CHUNK_VOLUME);
    if counts[1] == 0 {
        chunk.set_single_palette(AIR);
    } else if counts[0] == 0 {
        chunk.set_single_palette(STONE);
    } else {
        chunk.load_dense(vec![AIR, STONE], scratch.to_vec());
    }
}
