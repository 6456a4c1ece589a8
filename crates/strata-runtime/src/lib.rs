//! Worker lanes and job queues for generation and meshing.
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use strata_blocks::BlockRegistry;
use strata_chunk::{ChunkCoord, PaletteChunk};
use strata_mesh_cpu::{
    build_chunk_mesh, compute_connected_faces, FloodScratch, MeshBuild, MeshData,
};
use strata_world::Generator;

/// Batch of chunk coordinates to fill, with the revision each was issued at.
#[derive(Clone, Debug)]
pub struct GenJob {
    pub coords: Vec<(ChunkCoord, u64)>,
    pub job_id: u64,
}

pub struct GenJobOut {
    pub chunks: Vec<(PaletteChunk, u64)>,
    /// The batch as requested, echoed back so an abandoned pass can release
    /// its pending flags.
    pub coords: Vec<(ChunkCoord, u64)>,
    pub job_id: u64,
    pub cancelled: bool,
    pub failed: bool,
}

/// One chunk to re-mesh: copies of it and its six neighbors, plus an
/// optional recycled output buffer from the mesh pool.
pub struct MeshItem {
    pub coord: ChunkCoord,
    pub rev: u64,
    pub chunk: PaletteChunk,
    pub neighbors: Box<[Option<PaletteChunk>; 6]>,
    pub recycled: Option<MeshData>,
}

/// Batch of mesh items; one batch runs on one worker.
pub struct MeshJob {
    pub items: Vec<MeshItem>,
    pub job_id: u64,
}

pub struct MeshResult {
    pub coord: ChunkCoord,
    pub rev: u64,
    /// `None` for chunks with no visible faces.
    pub mesh: Option<MeshData>,
}

pub struct MeshJobOut {
    pub results: Vec<MeshResult>,
    pub job_id: u64,
    pub cancelled: bool,
}

/// Two worker lanes (generation, meshing) fed through per-worker channels by
/// round-robin dispatcher threads. Queue and in-flight counters let the
/// orchestrator quiesce every worker at a checkpoint.
pub struct Runtime {
    gen_tx: mpsc::Sender<GenJob>,
    mesh_tx: mpsc::Sender<MeshJob>,
    gen_res_rx: mpsc::Receiver<GenJobOut>,
    mesh_res_rx: mpsc::Receiver<MeshJobOut>,
    // Held to keep worker channels alive.
    _gen_worker_txs: Vec<mpsc::Sender<GenJob>>,
    _mesh_worker_txs: Vec<mpsc::Sender<MeshJob>>,
    q_gen: Arc<AtomicUsize>,
    q_mesh: Arc<AtomicUsize>,
    inflight_gen: Arc<AtomicUsize>,
    inflight_mesh: Arc<AtomicUsize>,
    cancel: Arc<AtomicBool>,
    next_job_id: AtomicU64,
    pub w_gen: usize,
    pub w_mesh: usize,
}

impl Runtime {
    pub fn new(
        gen: Arc<Generator>,
        reg: Arc<BlockRegistry>,
        cull_chunks: bool,
        add_border_walls: bool,
    ) -> Self {
        let worker_count = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        // Split workers between the lanes, at least one each.
        let w_gen = (worker_count / 2).max(1);
        let w_mesh = worker_count.saturating_sub(w_gen).max(1);

        let (gen_tx, gen_rx) = mpsc::channel::<GenJob>();
        let (mesh_tx, mesh_rx) = mpsc::channel::<MeshJob>();
        let (gen_res_tx, gen_res_rx) = mpsc::channel::<GenJobOut>();
        let (mesh_res_tx, mesh_res_rx) = mpsc::channel::<MeshJobOut>();

        let q_gen = Arc::new(AtomicUsize::new(0));
        let q_mesh = Arc::new(AtomicUsize::new(0));
        let inflight_gen = Arc::new(AtomicUsize::new(0));
        let inflight_mesh = Arc::new(AtomicUsize::new(0));
        let cancel = Arc::new(AtomicBool::new(false));

        // GEN workers: fill each coordinate, then analyze connectivity so a
        // chunk's generation happens-before its connectivity compute. Each
        // worker owns its sampling context and flood-fill state, reused
        // across every job it takes.
        let mut gen_worker_txs: Vec<mpsc::Sender<GenJob>> = Vec::with_capacity(w_gen);
        for _ in 0..w_gen {
            let (wtx, wrx) = mpsc::channel::<GenJob>();
            gen_worker_txs.push(wtx);
            let tx = gen_res_tx.clone();
            let gen = Arc::clone(&gen);
            let reg = Arc::clone(&reg);
            let cancel = Arc::clone(&cancel);
            let inflight = Arc::clone(&inflight_gen);
            thread::spawn(move || {
                let mut ctx = gen.make_ctx();
                let mut flood = FloodScratch::new();
                while let Ok(job) = wrx.recv() {
                    let mut out = Vec::with_capacity(job.coords.len());
                    let mut cancelled = false;
                    let mut failed = false;
                    for &(coord, rev) in &job.coords {
                        if cancel.load(Ordering::Relaxed) {
                            // Partial results are discarded on cancellation.
                            out.clear();
                            cancelled = true;
                            break;
                        }
                        let mut chunk = PaletteChunk::unloaded(coord);
                        match gen.fill_chunk(&mut ctx, coord, &mut chunk) {
                            Ok(()) => {
                                if cull_chunks {
                                    chunk.connected_faces =
                                        compute_connected_faces(&chunk, &reg, &mut flood);
                                }
                                out.push((chunk, rev));
                            }
                            Err(e) => {
                                log::warn!("chunk fill failed at {coord:?}: {e}");
                                out.clear();
                                failed = true;
                                break;
                            }
                        }
                    }
                    let _ = tx.send(GenJobOut {
                        chunks: out,
                        coords: job.coords,
                        job_id: job.job_id,
                        cancelled,
                        failed,
                    });
                    inflight.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }

        // MESH workers
        let mut mesh_worker_txs: Vec<mpsc::Sender<MeshJob>> = Vec::with_capacity(w_mesh);
        for _ in 0..w_mesh {
            let (wtx, wrx) = mpsc::channel::<MeshJob>();
            mesh_worker_txs.push(wtx);
            let tx = mesh_res_tx.clone();
            let reg = Arc::clone(&reg);
            let cancel = Arc::clone(&cancel);
            let inflight = Arc::clone(&inflight_mesh);
            thread::spawn(move || {
                let mut build = MeshBuild::default();
                while let Ok(job) = wrx.recv() {
                    let mut results = Vec::with_capacity(job.items.len());
                    let mut cancelled = false;
                    for item in job.items {
                        if cancel.load(Ordering::Relaxed) {
                            // Recycled buffers in unprocessed items drop here.
                            results.clear();
                            cancelled = true;
                            break;
                        }
                        let neighbors: [Option<&PaletteChunk>; 6] = [
                            item.neighbors[0].as_ref(),
                            item.neighbors[1].as_ref(),
                            item.neighbors[2].as_ref(),
                            item.neighbors[3].as_ref(),
                            item.neighbors[4].as_ref(),
                            item.neighbors[5].as_ref(),
                        ];
                        build_chunk_mesh(
                            &item.chunk,
                            &neighbors,
                            &reg,
                            add_border_walls,
                            &mut build,
                        );
                        let mesh = if build.is_empty() {
                            None
                        } else {
                            let mut data = item.recycled.unwrap_or_default();
                            build.pack_into(&mut data);
                            Some(data)
                        };
                        results.push(MeshResult {
                            coord: item.coord,
                            rev: item.rev,
                            mesh,
                        });
                    }
                    let _ = tx.send(MeshJobOut {
                        results,
                        job_id: job.job_id,
                        cancelled,
                    });
                    inflight.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }

        // GEN dispatcher: round-robin over gen workers.
        {
            let worker_txs = gen_worker_txs.clone();
            let q = Arc::clone(&q_gen);
            let inflight = Arc::clone(&inflight_gen);
            thread::spawn(move || {
                let mut i = 0usize;
                while let Ok(job) = gen_rx.recv() {
                    // Raise inflight before dropping the queue count so the
                    // outstanding sum never dips to zero mid hand-off.
                    inflight.fetch_add(1, Ordering::SeqCst);
                    q.fetch_sub(1, Ordering::SeqCst);
                    if worker_txs[i % worker_txs.len()].send(job).is_err() {
                        inflight.fetch_sub(1, Ordering::SeqCst);
                    }
                    i = i.wrapping_add(1);
                }
            });
        }

        // MESH dispatcher
        {
            let worker_txs = mesh_worker_txs.clone();
            let q = Arc::clone(&q_mesh);
            let inflight = Arc::clone(&inflight_mesh);
            thread::spawn(move || {
                let mut i = 0usize;
                while let Ok(job) = mesh_rx.recv() {
                    inflight.fetch_add(1, Ordering::SeqCst);
                    q.fetch_sub(1, Ordering::SeqCst);
                    if worker_txs[i % worker_txs.len()].send(job).is_err() {
                        inflight.fetch_sub(1, Ordering::SeqCst);
                    }
                    i = i.wrapping_add(1);
                }
            });
        }

        Self {
            gen_tx,
            mesh_tx,
            gen_res_rx,
            mesh_res_rx,
            _gen_worker_txs: gen_worker_txs,
            _mesh_worker_txs: mesh_worker_txs,
            q_gen,
            q_mesh,
            inflight_gen,
            inflight_mesh,
            cancel,
            next_job_id: AtomicU64::new(1),
            w_gen,
            w_mesh,
        }
    }

    #[inline]
    pub fn next_job_id(&self) -> u64 {
        self.next_job_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn submit_gen_job(&self, job: GenJob) {
        self.q_gen.fetch_add(1, Ordering::SeqCst);
        if self.gen_tx.send(job).is_err() {
            self.q_gen.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn submit_mesh_job(&self, job: MeshJob) {
        self.q_mesh.fetch_add(1, Ordering::SeqCst);
        if self.mesh_tx.send(job).is_err() {
            self.q_mesh.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn drain_gen_results(&self) -> Vec<GenJobOut> {
        self.gen_res_rx.try_iter().collect()
    }

    pub fn drain_mesh_results(&self) -> Vec<MeshJobOut> {
        self.mesh_res_rx.try_iter().collect()
    }

    /// Shared cancellation flag threaded through every asynchronous step.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    /// Jobs queued or executing right now, both lanes.
    pub fn outstanding(&self) -> usize {
        self.q_gen.load(Ordering::SeqCst)
            + self.q_mesh.load(Ordering::SeqCst)
            + self.inflight_gen.load(Ordering::SeqCst)
            + self.inflight_mesh.load(Ordering::SeqCst)
    }

    /// Spin-waits until every worker has gone idle.
    pub fn quiesce(&self) {
        while self.outstanding() > 0 {
            thread::yield_now();
        }
    }

    /// `(queued_gen, inflight_gen, queued_mesh, inflight_mesh)`.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.q_gen.load(Ordering::Relaxed),
            self.inflight_gen.load(Ordering::Relaxed),
            self.q_mesh.load(Ordering::Relaxed),
            self.inflight_mesh.load(Ordering::Relaxed),
        )
    }
}
