//! HNSW query execution (§4.G).
//!
//! Greedy descent through the upper layers followed by a bounded
//! best-first beam at layer 0, the same two-phase shape as the teacher's
//! `HnswIndex::search`, rewritten against [`Graph`] and the generic
//! [`Space`] trait instead of an inline `&[f32]` callback, and given an
//! explicit deadline so a query can be cancelled between expansions
//! without ever mutating graph state (§5).

use std::time::Instant;

use crate::error::Result;
use crate::heap::{CandidateHeap, NeighborHeap};
use crate::space::Space;
use crate::visited::VisitedPool;

use super::graph::Graph;

/// Executes k-NN and range queries against a frozen [`Graph`].
pub struct HnswSearcher<'a> {
    graph: &'a Graph,
    space: &'a dyn Space,
    visited: VisitedPool,
}

/// Outcome of a query: either a complete ranked result list, or a
/// best-effort list returned because the deadline was reached (§7:
/// `Cancelled` never surfaces as an `Err`, only as this variant).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Cancelled(T),
}

impl<T> Outcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Complete(v) | Outcome::Cancelled(v) => v,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }
}

impl<'a> HnswSearcher<'a> {
    pub fn new(graph: &'a Graph, space: &'a dyn Space) -> Self {
        let visited = VisitedPool::new(graph.len());
        Self { graph, space, visited }
    }

    /// `knn_query(q, k, ef) -> Vec<(id, dist)>`, sorted ascending by
    /// distance (§6.3). `ef` is clamped up to `k` if smaller.
    #[tracing::instrument(skip_all, fields(k, ef))]
    pub fn knn_query(
        &self,
        query: &[u8],
        k: usize,
        ef: usize,
        deadline: Option<Instant>,
    ) -> Result<Outcome<Vec<(u32, f32)>>> {
        let ef = ef.max(k);
        if self.graph.is_empty() || k == 0 {
            return Ok(Outcome::Complete(Vec::new()));
        }

        let Some((mut ep, ep_layer)) = self.graph.entry_point() else {
            return Ok(Outcome::Complete(Vec::new()));
        };
        let mut ep_dist = self.space.distance_query(query, ep)?;

        if self.graph.len() == 1 {
            return Ok(Outcome::Complete(vec![(ep, ep_dist)]));
        }

        for layer in (1..=ep_layer).rev() {
            if deadline.is_some_and(|d| Instant::now() > d) {
                return Ok(Outcome::Cancelled(vec![(ep, ep_dist)]));
            }
            let (next, next_dist) = self.greedy_descend(query, ep, ep_dist, layer)?;
            ep = next;
            ep_dist = next_dist;
        }

        let mut visited = self.visited.acquire();
        visited.reset();
        visited.visit(ep);

        let mut result = NeighborHeap::new(ef.max(1));
        result.try_push(ep_dist, ep);

        let mut candidates = CandidateHeap::new();
        candidates.push(ep_dist, ep);

        let mut cancelled = false;

        while let Some((cur_dist, cur_id)) = candidates.pop_min() {
            if deadline.is_some_and(|d| Instant::now() > d) {
                cancelled = true;
                break;
            }

            if result.is_full() {
                if let Some((worst, _)) = result.peek_worst() {
                    if cur_dist > worst {
                        break;
                    }
                }
            }

            for n in self.graph.neighbors(cur_id, 0) {
                if !visited.visit(n) {
                    continue;
                }
                let d = self.space.distance_query(query, n)?;
                let room = !result.is_full();
                let better = result.peek_worst().is_some_and(|(worst, _)| d < worst);
                if room || better {
                    result.try_push(d, n);
                    candidates.push(d, n);
                }
            }
        }

        let ranked = result.drain_sorted_ascending();
        let top_k: Vec<(u32, f32)> = ranked.into_iter().take(k).map(|(d, id)| (id, d)).collect();

        Ok(if cancelled {
            tracing::warn!(found = top_k.len(), requested = k, "query cancelled, returning partial results");
            Outcome::Cancelled(top_k)
        } else {
            Outcome::Complete(top_k)
        })
    }

    /// `range_query(q, r) -> Vec<(id, dist)>`, unsorted, every distance
    /// strictly less than `r` (§6.3). Implemented as an unbounded beam
    /// from the same entry descent, retaining every node visited whose
    /// distance is within range rather than capping to `k`.
    pub fn range_query(&self, query: &[u8], r: f32) -> Result<Vec<(u32, f32)>> {
        if self.graph.is_empty() {
            return Ok(Vec::new());
        }
        let Some((mut ep, ep_layer)) = self.graph.entry_point() else {
            return Ok(Vec::new());
        };
        let mut ep_dist = self.space.distance_query(query, ep)?;

        for layer in (1..=ep_layer).rev() {
            let (next, next_dist) = self.greedy_descend(query, ep, ep_dist, layer)?;
            ep = next;
            ep_dist = next_dist;
        }

        let mut visited = self.visited.acquire();
        visited.reset();
        visited.visit(ep);

        let mut out = Vec::new();
        if ep_dist < r {
            out.push((ep, ep_dist));
        }

        let mut frontier = vec![ep];
        let mut idx = 0;
        while idx < frontier.len() {
            let cur = frontier[idx];
            idx += 1;
            for n in self.graph.neighbors(cur, 0) {
                if !visited.visit(n) {
                    continue;
                }
                let d = self.space.distance_query(query, n)?;
                if d < r {
                    out.push((n, d));
                }
                frontier.push(n);
            }
        }

        Ok(out)
    }

    fn greedy_descend(
        &self,
        query: &[u8],
        mut ep: u32,
        mut ep_dist: f32,
        layer: u8,
    ) -> Result<(u32, f32)> {
        loop {
            let mut improved = false;
            for n in self.graph.neighbors(ep, layer) {
                let d = self.space.distance_query(query, n)?;
                if d < ep_dist {
                    ep = n;
                    ep_dist = d;
                    improved = true;
                }
            }
            if !improved {
                return Ok((ep, ep_dist));
            }
        }
    }
}
