//! PNII query planning (§4.J).
//!
//! Ranks pivots by distance to the query, aggregates postings for the
//! query's pivot prefix into a sparse accumulator (shared-pivot counts),
//! selects the highest-count candidates, and re-ranks the survivors by
//! true distance — grounded on `postListUnion` in
//! `original_source/similarity_search/include/method/pivot_neighb_common.h`,
//! which merges a running `(id, count)` vector against a single posting
//! list; here the accumulator is a dense `cnt[0..N)` array reset via the
//! same generation trick as [`crate::visited`] rather than a sorted-merge
//! vector, since every posting list must be folded in, not just one.

use crate::config::PniiSearchParams;
use crate::error::Result;
use crate::heap::NeighborHeap;
use crate::space::Space;

use super::pivots::PivotSet;
use super::postings::Postings;

/// A reusable sparse accumulator over object ids, generation-stamped like
/// [`crate::visited::VisitedSet`] so it can be reset in O(1) between
/// queries on the same worker thread.
pub struct Accumulator {
    counts: Vec<u32>,
    stamps: Vec<u32>,
    generation: u32,
}

impl Accumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            counts: vec![0; capacity],
            stamps: vec![0; capacity],
            generation: 1,
        }
    }

    pub fn reset(&mut self) {
        if self.generation == u32::MAX {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    fn bump(&mut self, id: u32) {
        let idx = id as usize;
        if self.stamps[idx] != self.generation {
            self.stamps[idx] = self.generation;
            self.counts[idx] = 1;
        } else {
            self.counts[idx] += 1;
        }
    }

    fn count(&self, id: u32) -> u32 {
        if self.stamps[id as usize] == self.generation {
            self.counts[id as usize]
        } else {
            0
        }
    }
}

pub struct PniiPlanner<'a> {
    space: &'a dyn Space,
    pivots: &'a PivotSet,
    postings: &'a Postings,
}

impl<'a> PniiPlanner<'a> {
    pub fn new(space: &'a dyn Space, pivots: &'a PivotSet, postings: &'a Postings) -> Self {
        Self { space, pivots, postings }
    }

    /// Rank every pivot by `distance_query(pivot, query)` ascending,
    /// returning pivot indices (§4.J step 1).
    fn rank_pivots(&self, query: &[u8]) -> Result<Vec<usize>> {
        let mut ranked: Vec<(f32, usize)> = Vec::with_capacity(self.pivots.len());
        for (idx, &pivot_id) in self.pivots.ids().iter().enumerate() {
            ranked.push((self.space.distance_query(query, pivot_id)?, idx));
        }
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked.into_iter().map(|(_, idx)| idx).collect())
    }

    /// `knn_query(q, k) -> Vec<(id, dist)>`, sorted ascending by distance.
    #[tracing::instrument(skip_all, fields(k, num_pivot_search = params.num_pivot_search))]
    pub fn knn_query(
        &self,
        query: &[u8],
        k: usize,
        params: PniiSearchParams,
        accumulator: &mut Accumulator,
    ) -> Result<Vec<(u32, f32)>> {
        params.validate(self.postings.num_pivot_index())?;

        let ranked_pivots = self.rank_pivots(query)?;
        let search_prefix = &ranked_pivots[..params.num_pivot_search.min(ranked_pivots.len())];

        accumulator.reset();
        for &pivot_idx in search_prefix {
            for &object in self.postings.list(pivot_idx) {
                accumulator.bump(object);
            }
        }

        let n = self.space.len();
        let cap = ((params.db_scan_frac as f64 * n as f64).ceil() as usize).max(1);

        let mut scored: Vec<(u32, u32)> = (0..n as u32)
            .map(|id| (id, accumulator.count(id)))
            .filter(|&(_, count)| count >= params.threshold as u32)
            .collect();
        // Highest shared-pivot count first; ties broken by ascending id (§4.J step 4).
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(cap);

        let mut heap = NeighborHeap::new(k);
        for (id, _) in scored {
            let dist = self.space.distance_query(query, id)?;
            heap.try_push(dist, id);
        }

        Ok(heap.drain_sorted_ascending().into_iter().map(|(d, id)| (id, d)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectBufferBuilder;
    use crate::space::{Metric, VectorSpace};
    use std::sync::Arc;

    fn make_space(points: &[[f32; 2]]) -> Arc<dyn Space> {
        let mut b = ObjectBufferBuilder::new();
        for p in points {
            let bytes: Vec<u8> = p.iter().flat_map(|f| f.to_le_bytes()).collect();
            b.push(&bytes, None).unwrap();
        }
        Arc::new(VectorSpace::new(b.build(), 2, Metric::Euclidean).unwrap())
    }

    fn query_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    #[test]
    fn p6_counter_matches_prefix_intersection() {
        let mut rng = fastrand::Rng::with_seed(11);
        let points: Vec<[f32; 2]> = (0..150).map(|_| [rng.f32(), rng.f32()]).collect();
        let space = make_space(&points);
        let pivots = crate::pnii::pivots::PivotSet::sample(space.len(), 16, 5).unwrap();
        let build_params = crate::config::PniiBuildParams::new(16, 6);
        let postings = crate::pnii::postings::build(space.clone(), &pivots, build_params).unwrap();

        let planner = PniiPlanner::new(space.as_ref(), &pivots, &postings);
        let query = query_bytes(&[0.5, 0.5]);
        let search_params = crate::config::PniiSearchParams::new(4, 0.5);
        let mut acc = Accumulator::new(space.len());

        let ranked_pivots = planner.rank_pivots(&query).unwrap();
        let search_prefix: std::collections::HashSet<usize> =
            ranked_pivots[..4].iter().copied().collect();

        acc.reset();
        for &pivot_idx in &search_prefix {
            for &object in postings.list(pivot_idx) {
                acc.bump(object);
            }
        }

        for object in 0..space.len() as u32 {
            let object_prefix: std::collections::HashSet<usize> = (0..pivots.len())
                .filter(|&idx| postings.list(idx).binary_search(&object).is_ok())
                .collect();
            let expected = search_prefix.intersection(&object_prefix).count() as u32;
            assert_eq!(acc.count(object), expected, "object {object}");
        }

        let _ = search_params;
    }

    #[test]
    fn knn_query_returns_at_most_k_results() {
        let mut rng = fastrand::Rng::with_seed(22);
        let points: Vec<[f32; 2]> = (0..200).map(|_| [rng.f32(), rng.f32()]).collect();
        let space = make_space(&points);
        let pivots = crate::pnii::pivots::PivotSet::sample(space.len(), 24, 2).unwrap();
        let postings = crate::pnii::postings::build(
            space.clone(),
            &pivots,
            crate::config::PniiBuildParams::new(24, 8),
        )
        .unwrap();

        let planner = PniiPlanner::new(space.as_ref(), &pivots, &postings);
        let query = query_bytes(&[0.5, 0.5]);
        let mut acc = Accumulator::new(space.len());
        let results = planner
            .knn_query(&query, 10, crate::config::PniiSearchParams::new(4, 0.2), &mut acc)
            .unwrap();
        assert!(results.len() <= 10);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
