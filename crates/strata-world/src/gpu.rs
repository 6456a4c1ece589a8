use std::sync::atomic::{AtomicBool, Ordering};

use strata_chunk::{ChunkCoord, PaletteChunk, CHUNK_VOLUME};

use crate::fill::pack_scratch;
use crate::gen::{GenError, Generator};

/// Upper bound on chunk origins uploaded per kernel dispatch.
pub const MAX_CHUNKS_PER_DISPATCH: usize = 4096;

/// Uniform block handed to the kernel alongside the origin buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelUniforms {
    pub offset: [f32; 3],
    pub scale: [f32; 3],
    pub offset2: f32,
    pub scale2: f32,
}

impl KernelUniforms {
    pub fn from_generator(gen: &Generator) -> Self {
        Self {
            offset: gen.params.offset,
            scale: gen.params.scale,
            offset2: gen.params.offset2,
            scale2: gen.params.scale2,
        }
    }
}

/// External compute executor. One work-group per origin, each producing
/// `CHUNK_VOLUME` bytes; `dispatch` blocks until the readback completes.
pub trait TerrainKernel: Send + Sync {
    fn dispatch(
        &self,
        kernel: &str,
        uniforms: &KernelUniforms,
        origins: &[[i32; 3]],
    ) -> Result<Vec<u8>, String>;
}

/// Generates `coords` through the kernel in dispatches of at most
/// `MAX_CHUNKS_PER_DISPATCH`, repacking every chunk's readback bytes under
/// the normal output contract. The palette is recomputed from the actual
/// bytes; kernel-side palette conventions never reach chunk state.
pub fn generate_gpu(
    kernel: &dyn TerrainKernel,
    gen: &Generator,
    coords: &[ChunkCoord],
    cancel: &AtomicBool,
) -> Result<Vec<PaletteChunk>, GenError> {
    let uniforms = KernelUniforms::from_generator(gen);
    let name = gen.variant.kernel_name();
    let mut out = Vec::with_capacity(coords.len());
    let mut scratch = vec![0u8; CHUNK_VOLUME];

    for batch in coords.chunks(MAX_CHUNKS_PER_DISPATCH) {
        if cancel.load(Ordering::Relaxed) {
            return Err(GenError::Cancelled);
        }
        let origins: Vec<[i32; 3]> = batch
            .iter()
            .map(|c| {
                let (x, y, z) = c.origin();
                [x, y, z]
            })
            .collect();
        log::debug!("dispatching {name} for {} chunk origins", origins.len());
        let bytes = kernel
            .dispatch(name, &uniforms, &origins)
            .map_err(GenError::Kernel)?;
        let expected = batch.len() * CHUNK_VOLUME;
        if bytes.len() != expected {
            return Err(GenError::ReadbackSize {
                expected,
                actual: bytes.len(),
            });
        }
        for (i, &coord) in batch.iter().enumerate() {
            let cell = &bytes[i * CHUNK_VOLUME..(i + 1) * CHUNK_VOLUME];
            let mut counts = [0usize; 2];
            for (dst, &src) in scratch.iter_mut().zip(cell) {
                let slot = (src != 0) as u8;
                *dst = slot;
                counts[slot as usize] += 1;
            }
            let mut chunk = PaletteChunk::unloaded(coord);
            pack_scratch(&mut chunk, &scratch, counts);
            out.push(chunk);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::{GenParams, GenVariant};
    use strata_blocks::{AIR, STONE};
    use strata_chunk::CHUNK_SIZE;

    /// Fake executor: solid below world y = 0, mirroring the flat kernel.
    struct FlatKernel;

    impl TerrainKernel for FlatKernel {
        fn dispatch(
            &self,
            _kernel: &str,
            _uniforms: &KernelUniforms,
            origins: &[[i32; 3]],
        ) -> Result<Vec<u8>, String> {
            let mut out = vec![0u8; origins.len() * CHUNK_VOLUME];
            for (i, origin) in origins.iter().enumerate() {
                let base = i * CHUNK_VOLUME;
                for y in 0..CHUNK_SIZE {
                    for z in 0..CHUNK_SIZE {
                        for x in 0..CHUNK_SIZE {
                            let wy = origin[1] + y as i32;
                            if wy < 0 {
                                // Kernel writes its own palette convention (2 = stone slot).
                                out[base + (y * CHUNK_SIZE + z) * CHUNK_SIZE + x] = 2;
                            }
                        }
                    }
                }
            }
            Ok(out)
        }
    }

    struct FailingKernel;

    impl TerrainKernel for FailingKernel {
        fn dispatch(
            &self,
            _kernel: &str,
            _uniforms: &KernelUniforms,
            _origins: &[[i32; 3]],
        ) -> Result<Vec<u8>, String> {
            Err("device lost".to_string())
        }
    }

    fn flat_gen() -> Generator {
        Generator::new(GenVariant::Flat, GenParams::default(), 0)
    }

    #[test]
    fn readback_packs_uniform_and_mixed_chunks() {
        let coords = [
            ChunkCoord::new(0, 1, 0),
            ChunkCoord::new(0, -1, 0),
        ];
        let cancel = AtomicBool::new(false);
        let chunks = generate_gpu(&FlatKernel, &flat_gen(), &coords, &cancel).unwrap();
        assert_eq!(chunks[0].palette(), &[AIR]);
        // Non-zero kernel bytes normalize to the stone slot.
        assert_eq!(chunks[1].palette(), &[STONE]);
        assert!(chunks[1].blocks().is_none());
    }

    #[test]
    fn cancellation_short_circuits() {
        let coords = [ChunkCoord::new(0, 0, 0)];
        let cancel = AtomicBool::new(true);
        let err = generate_gpu(&FlatKernel, &flat_gen(), &coords, &cancel);
        assert!(matches!(err, Err(GenError::Cancelled)));
    }

    #[test]
    fn dispatch_failure_surfaces_as_kernel_error() {
        let coords = [ChunkCoord::new(0, 0, 0)];
        let cancel = AtomicBool::new(false);
        let err = generate_gpu(&FailingKernel, &flat_gen(), &coords, &cancel);
        assert!(matches!(err, Err(GenError::Kernel(_))));
    }
}
