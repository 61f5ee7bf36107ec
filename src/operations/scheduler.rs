//! Sweeping an operation over every edge of a mesh.
//!
//! Edges are captured as vertex pairs before the sweep and looked up again
//! right before each attempt, so an edge destroyed by an earlier edit is
//! counted as skipped instead of failing on a stale tuple.
//!
//! With the `rayon` feature, [`Scheduler::run_parallel`] applies edits
//! concurrently on a root mesh without children. Every worker try-locks the
//! vertices of the edge's neighbourhood (both vertex stars and their facet
//! neighbours); two edits whose locked vertex sets are disjoint touch
//! disjoint cells, so their scopes never write the same records. Edges whose
//! locks stay busy are deferred and run sequentially at the end.

use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::Operation;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::{IdSimplex, Simplex};

/// Edge priority; higher values run first.
pub type PriorityFn = Arc<dyn Fn(&Mesh, &Simplex) -> f64 + Send + Sync>;

#[derive(Clone, Default)]
pub enum ScheduleOrder {
    /// Ascending edge id.
    #[default]
    Sequential,
    /// A shuffle seeded from [`SchedulerOptions::seed`].
    Random,
    Priority(PriorityFn),
}

impl fmt::Debug for ScheduleOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleOrder::Sequential => f.write_str("Sequential"),
            ScheduleOrder::Random => f.write_str("Random"),
            ScheduleOrder::Priority(_) => f.write_str("Priority(<fn>)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SchedulerOptions {
    pub seed: u64,
    /// Lock attempts per edge in a parallel sweep before it is deferred.
    pub max_attempts: usize,
    pub order: ScheduleOrder,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            max_attempts: 4,
            order: ScheduleOrder::Sequential,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub succeeded: usize,
    /// Edits rejected by an invariant, a strategy or the topology.
    pub failed: usize,
    /// Edges gone or stale by the time their turn came.
    pub skipped: usize,
}

impl SchedulerStats {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

/// Sort one edit result into the sweep statistics; structural errors abort.
fn classify<T>(result: Result<T, MeshError>) -> Result<Outcome, MeshError> {
    match result {
        Ok(_) => Ok(Outcome::Succeeded),
        Err(MeshError::StaleTuple { .. } | MeshError::DeletedSimplex(_)) => Ok(Outcome::Skipped),
        Err(e) if e.is_recoverable() => Ok(Outcome::Failed),
        Err(MeshError::UnsupportedOperation(_) | MeshError::InvalidTopology(_)) => Ok(Outcome::Failed),
        Err(e) => Err(e),
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Live edges as vertex pairs, in the configured order.
    fn ordered_edges(&self, mesh: &Mesh) -> Vec<[i64; 2]> {
        let ids = mesh.simplex_ids(PrimitiveType::Edge);
        let pair = |id: i64| {
            let v = mesh.id_simplex_vertices(IdSimplex::new(PrimitiveType::Edge, id));
            [v[0], v[1]]
        };
        match &self.options.order {
            ScheduleOrder::Sequential => ids.into_iter().map(pair).collect(),
            ScheduleOrder::Random => {
                let mut edges: Vec<[i64; 2]> = ids.into_iter().map(pair).collect();
                let mut rng = SmallRng::seed_from_u64(self.options.seed);
                edges.shuffle(&mut rng);
                edges
            }
            ScheduleOrder::Priority(priority) => {
                let mut scored: Vec<(f64, i64)> = ids
                    .into_iter()
                    .map(|id| {
                        let s = Simplex::edge(mesh.tuple_from_id(PrimitiveType::Edge, id));
                        (priority(mesh, &s), id)
                    })
                    .collect();
                scored.sort_by(|x, y| y.0.total_cmp(&x.0).then(x.1.cmp(&y.1)));
                scored.into_iter().map(|(_, id)| pair(id)).collect()
            }
        }
    }

    fn attempt(mesh: &Mesh, op: &dyn Operation, [u, w]: [i64; 2]) -> Result<Outcome, MeshError> {
        let Some(edge) = mesh.find_simplex(&[u, w]) else {
            return Ok(Outcome::Skipped);
        };
        classify(op.execute(mesh, &edge.tuple()))
    }

    /// Apply `op` once to every edge live at the start of the sweep.
    pub fn run(&self, mesh: &Mesh, op: &dyn Operation) -> Result<SchedulerStats, MeshError> {
        let edges = self.ordered_edges(mesh);
        let mut stats = SchedulerStats::default();
        for edge in edges {
            stats.record(Self::attempt(mesh, op, edge)?);
        }
        log::debug!(
            "{} sweep over {} edges: {stats:?}",
            op.kind().as_str(),
            stats.attempted()
        );
        Ok(stats)
    }
}

#[cfg(feature = "rayon")]
mod parallel {
    use hashbrown::HashSet;
    use parking_lot::Mutex;
    use rayon::prelude::*;

    use super::*;

    /// Vertices currently claimed by a worker.
    #[derive(Default)]
    struct VertexLocks {
        held: Mutex<HashSet<i64>>,
    }

    struct RegionLock<'a> {
        locks: &'a VertexLocks,
        vertices: HashSet<i64>,
    }

    impl VertexLocks {
        fn try_lock(&self, vertices: HashSet<i64>) -> Option<RegionLock<'_>> {
            let mut held = self.held.lock();
            if vertices.iter().any(|v| held.contains(v)) {
                return None;
            }
            held.extend(vertices.iter().copied());
            Some(RegionLock {
                locks: self,
                vertices,
            })
        }
    }

    impl Drop for RegionLock<'_> {
        fn drop(&mut self) {
            let mut held = self.locks.held.lock();
            for v in &self.vertices {
                held.remove(v);
            }
        }
    }

    /// Vertices of every cell an edit on `(u, w)` may read or write.
    fn region_vertices(mesh: &Mesh, u: i64, w: i64) -> Option<HashSet<i64>> {
        mesh.find_simplex(&[u, w])?;
        let mut cells = mesh.vertex_star(u);
        cells.extend(mesh.vertex_star(w));
        let mut out = HashSet::new();
        for c in cells {
            out.extend(mesh.cell_vertices(c));
            for n in mesh.neighbors(c) {
                if n >= 0 {
                    out.extend(mesh.cell_vertices(n));
                }
            }
        }
        Some(out)
    }

    enum Attempt {
        Done(Result<Outcome, MeshError>),
        Deferred([i64; 2]),
    }

    impl Scheduler {
        /// Apply `op` to every edge concurrently.
        ///
        /// Falls back to [`Scheduler::run`] on meshes that are part of a
        /// hierarchy, since a child replay reaches outside the locked region.
        pub fn run_parallel(&self, mesh: &Mesh, op: &dyn Operation) -> Result<SchedulerStats, MeshError> {
            let hierarchy = mesh.multi_mesh();
            if !hierarchy.is_root() || hierarchy.child_count() > 0 {
                log::debug!("mesh is part of a hierarchy; sweeping sequentially");
                return self.run(mesh, op);
            }
            let edges = self.ordered_edges(mesh);
            let locks = VertexLocks::default();
            let attempts = self.options.max_attempts.max(1);

            let results: Vec<Attempt> = edges
                .par_iter()
                .map(|&[u, w]| {
                    for _ in 0..attempts {
                        let Some(region) = region_vertices(mesh, u, w) else {
                            return Attempt::Done(Ok(Outcome::Skipped));
                        };
                        let Some(lock) = locks.try_lock(region) else {
                            std::thread::yield_now();
                            continue;
                        };
                        // the neighbourhood may have moved between the read and the lock
                        match region_vertices(mesh, u, w) {
                            None => return Attempt::Done(Ok(Outcome::Skipped)),
                            Some(again) if again.is_subset(&lock.vertices) => {
                                return Attempt::Done(Self::attempt(mesh, op, [u, w]));
                            }
                            Some(_) => continue,
                        }
                    }
                    Attempt::Deferred([u, w])
                })
                .collect();

            let mut stats = SchedulerStats::default();
            let mut deferred = Vec::new();
            for r in results {
                match r {
                    Attempt::Done(outcome) => stats.record(outcome?),
                    Attempt::Deferred(edge) => deferred.push(edge),
                }
            }
            if !deferred.is_empty() {
                log::warn!(
                    "{} edges starved for locks after {attempts} attempts; running them sequentially",
                    deferred.len()
                );
            }
            for edge in deferred {
                stats.record(Self::attempt(mesh, op, edge)?);
            }
            log::debug!(
                "parallel {} sweep over {} edges: {stats:?}",
                op.kind().as_str(),
                stats.attempted()
            );
            Ok(stats)
        }
    }

}
