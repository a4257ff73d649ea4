//! Unifying index facade (§6.3, §9).
//!
//! The two concrete indices (HNSW, PNII) and a brute-force `ExactScan` used
//! as the correctness oracle in the end-to-end scenarios (§8) all answer the
//! same two questions — "k nearest" and "everything within r" — through one
//! [`Index`] trait, so a caller (or a benchmark, or a test harness comparing
//! approximate results against the oracle) can hold a `&dyn Index` without
//! caring which strategy built it.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::{HnswParams, PniiBuildParams, PniiSearchParams};
use crate::error::Result;
use crate::heap::NeighborHeap;
use crate::hnsw::{self, Graph, HnswSearcher, Outcome};
use crate::pnii::{self, Accumulator, PivotSet, PniiPlanner, Postings};
use crate::space::Space;

/// Common query surface over any index strategy.
pub trait Index: Send + Sync {
    /// Number of objects the index was built over.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `k` nearest neighbors of `query`, ascending by distance.
    fn knn_query(&self, query: &[u8], k: usize) -> Result<Outcome<Vec<(u32, f32)>>>;

    /// Every object within distance `r` of `query`, unordered.
    fn range_query(&self, query: &[u8], r: f32) -> Result<Vec<(u32, f32)>>;
}

/// Brute-force scan, used as the correctness oracle for recall checks (§8)
/// and as a fallback strategy for spaces too small to justify an
/// approximate index.
pub struct ExactScan {
    space: Arc<dyn Space>,
}

impl ExactScan {
    pub fn new(space: Arc<dyn Space>) -> Self {
        Self { space }
    }
}

impl Index for ExactScan {
    fn len(&self) -> usize {
        self.space.len()
    }

    fn knn_query(&self, query: &[u8], k: usize) -> Result<Outcome<Vec<(u32, f32)>>> {
        let mut heap = NeighborHeap::new(k.max(1));
        for id in 0..self.space.len() as u32 {
            let dist = self.space.distance_query(query, id)?;
            heap.try_push(dist, id);
        }
        let results = heap.drain_sorted_ascending().into_iter().map(|(d, id)| (id, d)).collect();
        Ok(Outcome::Complete(results))
    }

    fn range_query(&self, query: &[u8], r: f32) -> Result<Vec<(u32, f32)>> {
        let mut out = Vec::new();
        for id in 0..self.space.len() as u32 {
            let dist = self.space.distance_query(query, id)?;
            if dist < r {
                out.push((id, dist));
            }
        }
        Ok(out)
    }
}

/// A built HNSW graph bundled with the space it indexes and the default
/// search parameters used when a caller doesn't specify `ef` directly.
pub struct HnswIndex {
    graph: Graph,
    space: Arc<dyn Space>,
    default_ef: usize,
}

impl HnswIndex {
    pub fn build(space: Arc<dyn Space>, params: HnswParams, default_ef: usize) -> Result<Self> {
        let graph = hnsw::build(space.clone(), params)?;
        Ok(Self { graph, space, default_ef })
    }

    /// Query with an explicit `ef` and an optional deadline, bypassing the
    /// default `ef` stored at construction.
    pub fn knn_query_with(
        &self,
        query: &[u8],
        k: usize,
        ef: usize,
        deadline: Option<Instant>,
    ) -> Result<Outcome<Vec<(u32, f32)>>> {
        HnswSearcher::new(&self.graph, self.space.as_ref()).knn_query(query, k, ef, deadline)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        hnsw::persist::save(&self.graph, path)
    }

    pub fn load(space: Arc<dyn Space>, default_ef: usize, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let graph = hnsw::persist::load(space.len(), path)?;
        Ok(Self { graph, space, default_ef })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl Index for HnswIndex {
    fn len(&self) -> usize {
        self.graph.len()
    }

    fn knn_query(&self, query: &[u8], k: usize) -> Result<Outcome<Vec<(u32, f32)>>> {
        self.knn_query_with(query, k, self.default_ef.max(k), None)
    }

    fn range_query(&self, query: &[u8], r: f32) -> Result<Vec<(u32, f32)>> {
        HnswSearcher::new(&self.graph, self.space.as_ref()).range_query(query, r)
    }
}

/// A built PNII index bundled with a reusable accumulator, guarded by a
/// mutex so [`Index::knn_query`]'s `&self` receiver can still drive the
/// per-query scratch state a [`PniiPlanner`] needs.
pub struct PniiIndex {
    pivots: PivotSet,
    postings: Postings,
    space: Arc<dyn Space>,
    default_search: PniiSearchParams,
    accumulator: Mutex<Accumulator>,
}

impl PniiIndex {
    pub fn build(space: Arc<dyn Space>, params: PniiBuildParams, default_search: PniiSearchParams) -> Result<Self> {
        let n = space.len();
        let (pivots, postings) = pnii::build(space.clone(), params)?;
        Ok(Self {
            pivots,
            postings,
            space,
            default_search,
            accumulator: Mutex::new(Accumulator::new(n)),
        })
    }

    pub fn knn_query_with(&self, query: &[u8], k: usize, params: PniiSearchParams) -> Result<Vec<(u32, f32)>> {
        let planner = PniiPlanner::new(self.space.as_ref(), &self.pivots, &self.postings);
        let mut accumulator = self.accumulator.lock();
        planner.knn_query(query, k, params, &mut accumulator)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        pnii::persist::save(self.space.len(), &self.pivots, &self.postings, path)
    }

    pub fn load(space: Arc<dyn Space>, default_search: PniiSearchParams, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let n = space.len();
        let (pivots, postings) = pnii::persist::load(n, path)?;
        Ok(Self {
            pivots,
            postings,
            space,
            default_search,
            accumulator: Mutex::new(Accumulator::new(n)),
        })
    }
}

impl Index for PniiIndex {
    fn len(&self) -> usize {
        self.space.len()
    }

    fn knn_query(&self, query: &[u8], k: usize) -> Result<Outcome<Vec<(u32, f32)>>> {
        let results = self.knn_query_with(query, k, self.default_search)?;
        Ok(Outcome::Complete(results))
    }

    /// PNII has no notion of an unbounded radius scan over posting lists;
    /// this re-expresses range search as an unbounded-`k` k-NN query
    /// filtered by distance, matching the exact scan's semantics at the
    /// cost of touching every candidate the planner would otherwise cap.
    fn range_query(&self, query: &[u8], r: f32) -> Result<Vec<(u32, f32)>> {
        let params = PniiSearchParams { db_scan_frac: 1.0, ..self.default_search };
        let results = self.knn_query_with(query, self.space.len().max(1), params)?;
        Ok(results.into_iter().filter(|&(_, d)| d < r).collect())
    }
}
