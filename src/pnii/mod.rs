//! Pivot-Neighborhood Inverted Index (§2.H-J, §4.H-J).

pub mod persist;
pub mod pivots;
pub mod planner;
pub mod postings;

pub use pivots::PivotSet;
pub use planner::{Accumulator, PniiPlanner};
pub use postings::Postings;

use std::sync::Arc;

use crate::config::PniiBuildParams;
use crate::error::Result;
use crate::space::Space;

/// Build both halves of a PNII index (pivot set, then postings) in one call.
#[tracing::instrument(skip_all, fields(n = space.len(), num_pivots = params.num_pivots))]
pub fn build(space: Arc<dyn Space>, params: PniiBuildParams) -> Result<(PivotSet, Postings)> {
    params.validate()?;
    let pivots = PivotSet::sample(space.len(), params.num_pivots, params.seed)?;
    let postings = postings::build(space, &pivots, params)?;
    Ok((pivots, postings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PniiSearchParams;
    use crate::object::ObjectBufferBuilder;
    use crate::space::{Metric, VectorSpace};

    fn unit_sphere_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = fastrand::Rng::with_seed(seed);
        (0..n)
            .map(|_| {
                let mut v: Vec<f32> = (0..dim).map(|_| rng.f32() * 2.0 - 1.0).collect();
                let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    v.iter_mut().for_each(|x| *x /= norm);
                }
                v
            })
            .collect()
    }

    fn encode(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn exact_top_k(space: &dyn Space, query: &[u8], k: usize) -> Vec<u32> {
        let mut scored: Vec<(f32, u32)> = (0..space.len() as u32)
            .map(|id| (space.distance_query(query, id).unwrap(), id))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        scored.truncate(k);
        scored.into_iter().map(|(_, id)| id).collect()
    }

    #[test]
    fn pnii_build_query_scenario_recall() {
        // End-to-end scenario 3 (§8): 1000 points, recall@10 >= 0.6.
        let dim = 32;
        let vectors = unit_sphere_vectors(1000, dim, 99);
        let mut b = ObjectBufferBuilder::new();
        for v in &vectors {
            b.push(&encode(v), None).unwrap();
        }
        let space: Arc<dyn Space> = Arc::new(VectorSpace::new(b.build(), dim, Metric::Euclidean).unwrap());

        let params = PniiBuildParams::new(32, 12).with_seed(5);
        let (pivots, postings) = build(space.clone(), params).unwrap();
        let planner = PniiPlanner::new(space.as_ref(), &pivots, &postings);

        let mut acc = Accumulator::new(space.len());
        let search_params = PniiSearchParams::new(8, 0.2);

        let mut hits = 0;
        let num_queries = 30;
        for q in &vectors[..num_queries] {
            let query_bytes = encode(q);
            let exact = exact_top_k(space.as_ref(), &query_bytes, 10);
            let approx = planner.knn_query(&query_bytes, 10, search_params, &mut acc).unwrap();
            let approx_ids: std::collections::HashSet<u32> = approx.iter().map(|(id, _)| *id).collect();
            hits += exact.iter().filter(|id| approx_ids.contains(id)).count();
        }

        let recall = hits as f32 / (num_queries * 10) as f32;
        assert!(recall >= 0.6, "recall@10 {recall} below 0.6");
    }
}
