use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use strata_blocks::{BlockId, BlockRegistry};
use strata_chunk::{ChunkCoord, ChunkStore, Face, PaletteChunk, CHUNK_SIZE};
use strata_geom::{Frustum, Vec3};
use strata_mesh_cpu::{compute_connected_faces, FloodScratch, MeshData};
use strata_runtime::{GenJob, MeshItem, MeshJob, Runtime};
use strata_world::{generate_gpu, Generator, TerrainKernel, MAX_CHUNKS_PER_DISPATCH};

use crate::config::EngineConfig;
use crate::edit::apply_box_edit;
use crate::error::EngineError;
use crate::raycast::{raycast, RayHit};
use crate::visibility::{traverse_visible, Viewpoint, VisibleChunk};

/// Renderer-side rescale: positions are unorm with `S` block edges packed
/// into 128/255 of the unit cube.
pub const MESH_WORLD_SCALE: f32 = CHUNK_SIZE as f32 * 255.0 / 128.0;

/// Object-to-world placement of a chunk mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: f32,
}

/// Per-rendered-chunk record: the mesh resource, its placement, and a
/// snapshot of the chunk's connectivity mask.
#[derive(Clone, Debug)]
pub struct ChunkRender {
    pub mesh: MeshData,
    pub transform: Transform,
    pub connected_faces: u16,
}

pub type RenderMap = HashMap<ChunkCoord, ChunkRender>;

/// LIFO pool of recycled mesh buffers keyed by byte capacity.
#[derive(Default)]
struct MeshPool {
    free: Vec<MeshData>,
}

const MESH_POOL_CAP: usize = 512;

impl MeshPool {
    /// Smallest pooled buffer that fits the request, searched most
    /// recently recycled first.
    fn acquire(&mut self, min_capacity: usize) -> Option<MeshData> {
        let mut best: Option<usize> = None;
        for (i, m) in self.free.iter().enumerate().rev() {
            let cap = m.capacity_bytes();
            if cap >= min_capacity {
                match best {
                    Some(b) if self.free[b].capacity_bytes() <= cap => {}
                    _ => best = Some(i),
                }
            }
        }
        best.map(|i| self.free.swap_remove(i))
    }

    fn recycle(&mut self, mut mesh: MeshData) {
        if self.free.len() >= MESH_POOL_CAP {
            return;
        }
        mesh.vertices.clear();
        mesh.indices.clear();
        mesh.vertex_count = 0;
        mesh.index_count = 0;
        self.free.push(mesh);
    }

    fn len(&self) -> usize {
        self.free.len()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngineStats {
    pub loaded_chunks: usize,
    pub rendered_chunks: usize,
    pub pending_chunks: usize,
    pub pooled_meshes: usize,
    /// Chunk loads and unloads triggered by the last viewer-chunk change.
    pub last_loads: usize,
    pub last_unloads: usize,
}

/// Streaming orchestrator: drives generation, connectivity, meshing, and
/// publication around a moving viewpoint. All chunk-store and render-map
/// mutation happens on the caller's context inside `update`/`set_block`;
/// workers only ever receive copies.
pub struct Engine {
    cfg: EngineConfig,
    reg: Arc<BlockRegistry>,
    gen: Arc<Generator>,
    runtime: Runtime,
    gpu: Option<Box<dyn TerrainKernel>>,
    store: ChunkStore,
    renders: RenderMap,
    pool: MeshPool,
    viewer_chunk: Option<ChunkCoord>,
    remesh_queue: Vec<ChunkCoord>,
    remesh_set: HashSet<ChunkCoord>,
    flood: FloodScratch,
    stats: EngineStats,
}

impl Engine {
    pub fn new(cfg: EngineConfig, registry: BlockRegistry) -> Result<Self, EngineError> {
        cfg.validate()?;
        let reg = Arc::new(registry);
        let gen = Arc::new(Generator::from_config(&cfg.generator));
        let runtime = Runtime::new(
            Arc::clone(&gen),
            Arc::clone(&reg),
            cfg.cull_chunks,
            cfg.add_border_walls,
        );
        Ok(Self {
            cfg,
            reg,
            gen,
            runtime,
            gpu: None,
            store: ChunkStore::new(),
            renders: RenderMap::default(),
            pool: MeshPool::default(),
            viewer_chunk: None,
            remesh_queue: Vec::new(),
            remesh_set: HashSet::new(),
            flood: FloodScratch::new(),
            stats: EngineStats::default(),
        })
    }

    /// Attaches the external compute executor used for GPU generation.
    pub fn with_gpu(mut self, kernel: Box<dyn TerrainKernel>) -> Self {
        self.gpu = Some(kernel);
        self
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    #[inline]
    pub fn registry(&self) -> &BlockRegistry {
        &self.reg
    }

    #[inline]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    #[inline]
    pub fn renders(&self) -> &RenderMap {
        &self.renders
    }

    pub fn stats(&self) -> EngineStats {
        let mut stats = self.stats;
        stats.loaded_chunks = self.store.iter().filter(|(_, c)| c.is_loaded()).count();
        stats.rendered_chunks = self.renders.len();
        stats.pending_chunks = self
            .store
            .iter()
            .filter(|(_, c)| c.is_pending_update)
            .count();
        stats.pooled_meshes = self.pool.len();
        stats
    }

    /// `(queued_gen, inflight_gen, queued_mesh, inflight_mesh)`.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        self.runtime.queue_debug_counts()
    }

    /// Per-frame pump. Reconciles the streaming window when the viewer
    /// crossed a chunk boundary, then merges finished worker results and
    /// schedules the next batches.
    pub fn update(&mut self, viewer_pos: Vec3) {
        let vc = ChunkCoord::containing(
            viewer_pos.x.floor() as i32,
            viewer_pos.y.floor() as i32,
            viewer_pos.z.floor() as i32,
        );
        if self.viewer_chunk != Some(vc) {
            self.viewer_chunk = Some(vc);
            self.refresh_window(vc);
        }
        self.pump();
    }

    /// Blocks until every queued load and remesh has been published.
    pub fn settle(&mut self, viewer_pos: Vec3) {
        self.update(viewer_pos);
        loop {
            self.runtime.quiesce();
            self.pump();
            if self.runtime.outstanding() == 0 && self.remesh_queue.is_empty() {
                break;
            }
        }
    }

    /// True when no background work is queued or executing.
    pub fn is_idle(&self) -> bool {
        self.runtime.outstanding() == 0 && self.remesh_queue.is_empty()
    }

    // --- streaming window ---

    fn refresh_window(&mut self, vc: ChunkCoord) {
        let v = self.cfg.view_distance;
        // A pass abandoned after a worker failure re-enters here.
        self.runtime.clear_cancel();

        for (_, chunk) in self.store.iter_mut() {
            chunk.is_in_view_distance = false;
        }

        let mut load_list: Vec<(ChunkCoord, u64)> = Vec::new();
        let mut fresh: Vec<ChunkCoord> = Vec::new();
        for dz in -v..v {
            for dy in -v..v {
                for dx in -v..v {
                    let coord = vc.offset(dx, dy, dz);
                    let chunk = self.store.get_or_insert_unloaded(coord);
                    chunk.is_in_view_distance = true;
                    if !chunk.is_loaded() && !chunk.is_pending_update {
                        chunk.is_pending_update = true;
                        chunk.rev += 1;
                        load_list.push((coord, chunk.rev));
                        fresh.push(coord);
                    }
                }
            }
        }
        // Loaded neighbors of incoming chunks refresh once the new contents
        // arrive; queue them now so a border seam never lingers.
        for coord in fresh {
            for face in Face::ALL {
                let n = coord.neighbor(face);
                if self.store.get(n).is_some_and(|c| c.is_loaded()) {
                    self.queue_remesh(n);
                }
            }
        }

        // Two-phase unload: collect, then delete.
        let dead: Vec<ChunkCoord> = self
            .store
            .iter()
            .filter(|(_, c)| !c.is_in_view_distance)
            .map(|(c, _)| *c)
            .collect();
        for coord in &dead {
            if let Some(mut chunk) = self.store.remove(*coord) {
                chunk.dispose();
            }
            if let Some(render) = self.renders.remove(coord) {
                self.pool.recycle(render.mesh);
            }
        }

        self.stats.last_loads = load_list.len();
        self.stats.last_unloads = dead.len();
        if !load_list.is_empty() || !dead.is_empty() {
            log::debug!(
                "viewer chunk {vc:?}: +{} loads, -{} unloads",
                load_list.len(),
                dead.len()
            );
        }

        self.drive_generation(load_list);
    }

    fn drive_generation(&mut self, load_list: Vec<(ChunkCoord, u64)>) {
        if load_list.is_empty() {
            return;
        }
        let gpu_capable =
            self.cfg.use_gpu_compute && self.gen.variant.gpu_supported() && self.gpu.is_some();

        if gpu_capable {
            self.generate_on_gpu(load_list);
        } else {
            if self.cfg.use_gpu_compute {
                log::debug!("gpu compute requested but unavailable; generating on cpu workers");
            }
            // Workers receive disjoint sub-ranges of the coordinate list.
            let per_worker = load_list.len().div_ceil(self.runtime.w_gen).max(1);
            for span in load_list.chunks(per_worker) {
                self.runtime.submit_gen_job(GenJob {
                    coords: span.to_vec(),
                    job_id: self.runtime.next_job_id(),
                });
            }
        }
    }

    fn generate_on_gpu(&mut self, load_list: Vec<(ChunkCoord, u64)>) {
        for (batch_no, batch) in load_list.chunks(MAX_CHUNKS_PER_DISPATCH).enumerate() {
            let result = {
                let Some(kernel) = self.gpu.as_deref() else {
                    return;
                };
                let coords: Vec<ChunkCoord> = batch.iter().map(|(c, _)| *c).collect();
                let cancel = self.runtime.cancel_flag();
                generate_gpu(kernel, &self.gen, &coords, &cancel)
            };
            match result {
                Ok(chunks) => {
                    // Connectivity runs per readback batch, between dispatches.
                    for (mut chunk, &(_, rev)) in chunks.into_iter().zip(batch.iter()) {
                        if self.cfg.cull_chunks {
                            chunk.connected_faces =
                                compute_connected_faces(&chunk, &self.reg, &mut self.flood);
                        }
                        self.install_generated(chunk, rev);
                    }
                }
                Err(e) => {
                    // Dispatch failure and readback cancellation both leave
                    // the rest of the span for the next pass to regenerate.
                    log::warn!("gpu generation pass abandoned at batch {batch_no}: {e}");
                    for &(coord, _) in &load_list[batch_no * MAX_CHUNKS_PER_DISPATCH..] {
                        if let Some(chunk) = self.store.get_mut(coord) {
                            chunk.is_pending_update = false;
                        }
                    }
                    return;
                }
            }
        }
    }

    fn install_generated(&mut self, generated: PaletteChunk, rev: u64) {
        let coord = generated.coord;
        let Some(chunk) = self.store.get_mut(coord) else {
            // Unloaded while the worker ran; drop the result.
            return;
        };
        if chunk.rev != rev {
            log::debug!("stale generation result for {coord:?} dropped");
            return;
        }
        chunk.adopt_contents(generated);
        chunk.is_pending_update = false;
        self.queue_remesh(coord);
        for face in Face::ALL {
            let n = coord.neighbor(face);
            if self.store.get(n).is_some_and(|c| c.is_loaded()) {
                self.queue_remesh(n);
            }
        }
    }

    // --- worker result merge + scheduling ---

    fn pump(&mut self) {
        for out in self.runtime.drain_gen_results() {
            if out.failed {
                // Worker failures cancel the rest of the pass; the next
                // viewer movement retriggers the pipeline.
                log::warn!("generation job {} failed; cancelling pass", out.job_id);
                self.runtime.request_cancel();
            }
            if out.failed || out.cancelled {
                // Release the batch so the next pass regenerates it.
                for (coord, rev) in out.coords {
                    if let Some(chunk) = self.store.get_mut(coord) {
                        if chunk.rev == rev {
                            chunk.is_pending_update = false;
                        }
                    }
                }
                continue;
            }
            for (chunk, rev) in out.chunks {
                self.install_generated(chunk, rev);
            }
        }

        self.schedule_remesh_batches();

        for out in self.runtime.drain_mesh_results() {
            for result in out.results {
                self.publish_mesh(result.coord, result.rev, result.mesh);
            }
        }
    }

    fn schedule_remesh_batches(&mut self) {
        if self.remesh_queue.is_empty() {
            return;
        }
        let queue = std::mem::take(&mut self.remesh_queue);
        self.remesh_set.clear();
        let batch_size = (queue.len() / 8).max(8);
        let mut items: Vec<MeshItem> = Vec::with_capacity(batch_size.min(queue.len()));
        for coord in queue {
            // Stamp a fresh revision so any older in-flight mesh of this
            // chunk is rejected at publish, whatever order results land in.
            let rev = {
                let Some(chunk) = self.store.get_mut(coord) else {
                    continue;
                };
                if !chunk.is_loaded() || !chunk.is_in_view_distance {
                    continue;
                }
                chunk.rev += 1;
                chunk.rev
            };
            let chunk = self.store.get(coord).expect("chunk checked above");
            let neighbors = self.store.neighbor_refs(coord);
            let recycled = self.pool.acquire(0);
            items.push(MeshItem {
                coord,
                rev,
                chunk: chunk.clone(),
                neighbors: Box::new([
                    neighbors[0].cloned(),
                    neighbors[1].cloned(),
                    neighbors[2].cloned(),
                    neighbors[3].cloned(),
                    neighbors[4].cloned(),
                    neighbors[5].cloned(),
                ]),
                recycled,
            });
            if items.len() >= batch_size {
                self.runtime.submit_mesh_job(MeshJob {
                    items: std::mem::take(&mut items),
                    job_id: self.runtime.next_job_id(),
                });
            }
        }
        if !items.is_empty() {
            self.runtime.submit_mesh_job(MeshJob {
                items,
                job_id: self.runtime.next_job_id(),
            });
        }
    }

    fn publish_mesh(&mut self, coord: ChunkCoord, rev: u64, mesh: Option<MeshData>) {
        let Some(chunk) = self.store.get(coord) else {
            if let Some(m) = mesh {
                self.pool.recycle(m);
            }
            return;
        };
        if chunk.rev != rev {
            // The chunk changed after this mesh was built; a newer job is
            // already queued or in flight.
            if let Some(m) = mesh {
                self.pool.recycle(m);
            }
            return;
        }
        match mesh {
            Some(mesh) => {
                let (ox, oy, oz) = coord.origin();
                let render = ChunkRender {
                    mesh,
                    transform: Transform {
                        translation: Vec3::new(ox as f32, oy as f32, oz as f32),
                        scale: MESH_WORLD_SCALE,
                    },
                    connected_faces: chunk.connectivity_mask(),
                };
                if let Some(old) = self.renders.insert(coord, render) {
                    self.pool.recycle(old.mesh);
                }
            }
            None => {
                if let Some(old) = self.renders.remove(&coord) {
                    self.pool.recycle(old.mesh);
                }
            }
        }
    }

    fn queue_remesh(&mut self, coord: ChunkCoord) {
        if self.remesh_set.insert(coord) {
            self.remesh_queue.push(coord);
        }
    }

    // --- user-facing operations ---

    /// Sets every block in `[box_min, box_min + box_size)` to `t`. Returns
    /// whether any loaded chunk was modified. Requests serialize through the
    /// engine's `&mut` receiver.
    pub fn set_block(
        &mut self,
        box_min: [i32; 3],
        box_size: [i32; 3],
        t: BlockId,
    ) -> Result<bool, EngineError> {
        let report = apply_box_edit(&mut self.store, box_min, box_size, t)?;
        for &coord in &report.modified {
            if let Some(chunk) = self.store.get_mut(coord) {
                chunk.rev += 1;
            }
            if self.cfg.cull_chunks {
                if let Some(chunk) = self.store.get(coord) {
                    let mask = compute_connected_faces(chunk, &self.reg, &mut self.flood);
                    if let Some(chunk) = self.store.get_mut(coord) {
                        chunk.connected_faces = mask;
                    }
                }
            }
            self.queue_remesh(coord);
        }
        for &coord in &report.remesh_neighbors {
            if self.store.get(coord).is_some_and(|c| c.is_loaded()) {
                self.queue_remesh(coord);
            }
        }
        Ok(report.any_modified())
    }

    /// DDA raycast against the current chunk store snapshot.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<RayHit> {
        raycast(&self.store, &self.reg, origin, dir, max_dist)
    }

    /// Chunks to draw this frame. With culling enabled this is the
    /// connectivity-constrained BFS; otherwise every rendered chunk that
    /// passes the frustum test, in no particular order.
    pub fn visible_chunks(
        &self,
        view: &Viewpoint,
        frustum: &Frustum,
        out: &mut Vec<VisibleChunk>,
    ) {
        if self.cfg.cull_chunks {
            traverse_visible(
                &self.store,
                &self.renders,
                view,
                frustum,
                self.cfg.view_distance,
                out,
            );
        } else {
            out.clear();
            for coord in self.renders.keys() {
                let (ox, oy, oz) = coord.origin();
                let min = Vec3::new(ox as f32, oy as f32, oz as f32);
                let s = CHUNK_SIZE as f32;
                let aabb = strata_geom::Aabb::new(min, min + Vec3::new(s, s, s));
                if frustum.intersects_aabb(aabb) {
                    out.push(VisibleChunk {
                        coord: *coord,
                        entered_through: None,
                    });
                }
            }
        }
    }

    /// Cancels the current pass, quiesces every worker, and releases all
    /// chunks, meshes, and queued work. The engine streams again from
    /// scratch on the next `update`.
    pub fn unload(&mut self) {
        self.runtime.request_cancel();
        self.runtime.quiesce();
        let _ = self.runtime.drain_gen_results();
        for out in self.runtime.drain_mesh_results() {
            for result in out.results {
                if let Some(m) = result.mesh {
                    drop(m);
                }
            }
        }

        let coords: Vec<ChunkCoord> = self.store.coords().collect();
        for coord in coords {
            if let Some(mut chunk) = self.store.remove(coord) {
                chunk.dispose();
            }
        }
        self.renders.clear();
        self.pool = MeshPool::default();
        self.remesh_queue.clear();
        self.remesh_set.clear();
        self.viewer_chunk = None;
        self.stats = EngineStats::default();
        self.runtime.clear_cancel();
        log::info!("engine unloaded");
    }
}
