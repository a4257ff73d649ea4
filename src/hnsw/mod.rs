//! Hierarchical Navigable Small World graph index (§2.E-G, §4.E-G).

pub mod builder;
pub mod graph;
pub mod persist;
pub mod search;

pub use builder::build;
pub use graph::Graph;
pub use search::{HnswSearcher, Outcome};

#[cfg(test)]
mod property_tests {
    use std::sync::Arc;

    use crate::config::HnswParams;
    use crate::object::ObjectBufferBuilder;
    use crate::space::{Metric, Space, VectorSpace};

    use super::*;

    fn random_space(n: usize, dim: usize, seed: u64) -> Arc<dyn Space> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut b = ObjectBufferBuilder::new();
        for _ in 0..n {
            let v: Vec<f32> = (0..dim).map(|_| rng.f32() * 2.0 - 1.0).collect();
            let bytes: Vec<u8> = v.iter().flat_map(|f| f.to_le_bytes()).collect();
            b.push(&bytes, None).unwrap();
        }
        Arc::new(VectorSpace::new(b.build(), dim, Metric::Euclidean).unwrap())
    }

    #[test]
    fn p1_degree_cap_and_no_self_or_duplicates() {
        let space = random_space(300, 8, 1);
        let graph = build(space, HnswParams::with_m(8)).unwrap();
        for id in 0..graph.len() as u32 {
            for layer in 0..=graph.top_layer(id) {
                let neighbors = graph.neighbors(id, layer);
                assert!(neighbors.len() <= graph.max_conn(layer));
                assert!(!neighbors.contains(&id));
                let mut sorted = neighbors.clone();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), neighbors.len());
            }
        }
    }

    #[test]
    fn p2_layer_zero_reachable_from_entry_point() {
        let space = random_space(200, 8, 2);
        let graph = build(space, HnswParams::with_m(8)).unwrap();
        let (entry, _) = graph.entry_point().unwrap();

        let mut visited = vec![false; graph.len()];
        let mut stack = vec![entry];
        visited[entry as usize] = true;
        while let Some(cur) = stack.pop() {
            for n in graph.neighbors(cur, 0) {
                if !visited[n as usize] {
                    visited[n as usize] = true;
                    stack.push(n);
                }
            }
        }

        let reached = visited.iter().filter(|&&v| v).count();
        assert_eq!(reached, graph.len());
    }

    #[test]
    fn p3_edges_are_symmetric_after_build() {
        let space = random_space(150, 8, 3);
        let graph = build(space, HnswParams::with_m(6)).unwrap();
        for x in 0..graph.len() as u32 {
            for layer in 0..=graph.top_layer(x) {
                for y in graph.neighbors(x, layer) {
                    let back = graph.neighbors(y, layer);
                    assert!(
                        back.contains(&x),
                        "edge {x}->{y} at layer {layer} has no reverse edge"
                    );
                }
            }
        }
    }
}
