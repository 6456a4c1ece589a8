use criterion::{black_box, criterion_group, criterion_main, Criterion};

use strata_blocks::BlockRegistry;
use strata_chunk::{ChunkCoord, PaletteChunk};
use strata_mesh_cpu::{build_chunk_mesh, compute_connected_faces, FloodScratch, MeshBuild};
use strata_world::{GenParams, GenVariant, Generator};

fn terrain_chunk() -> PaletteChunk {
    let params = GenParams {
        scale: [0.04, 1.0, 0.04],
        offset2: 0.4,
        scale2: 12.0,
        ..GenParams::default()
    };
    let gen = Generator::new(GenVariant::Simplex2d, params, 1337);
    let mut ctx = gen.make_ctx();
    let coord = ChunkCoord::new(0, 0, 0);
    let mut chunk = PaletteChunk::unloaded(coord);
    gen.fill_chunk(&mut ctx, coord, &mut chunk).unwrap();
    chunk
}

fn bench_build_chunk_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_chunk_mesh");
    let reg = BlockRegistry::with_defaults();
    let chunk = terrain_chunk();
    let neighbors: [Option<&PaletteChunk>; 6] = [None; 6];
    let mut out = MeshBuild::default();
    group.bench_function("simplex2d_16x16x16", |b| {
        b.iter(|| {
            build_chunk_mesh(&chunk, &neighbors, &reg, true, &mut out);
            black_box(out.index_count());
        })
    });
    group.finish();
}

fn bench_connected_faces(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_connected_faces");
    let reg = BlockRegistry::with_defaults();
    let chunk = terrain_chunk();
    let mut scratch = FloodScratch::new();
    group.bench_function("simplex2d_16x16x16", |b| {
        b.iter(|| {
            let mask = compute_connected_faces(&chunk, &reg, &mut scratch);
            black_box(mask);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build_chunk_mesh, bench_connected_faces);
criterion_main!(benches);
