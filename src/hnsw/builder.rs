//! HNSW construction (§4.F).
//!
//! Ports the teacher's `insert_node` / `search_layer_multi_builder` shape
//! from `hnsw.rs` onto the [`Graph`] arena, adding the diversity-pruning
//! neighbor-selection heuristic the teacher's `select_neighbors` skipped
//! ("the paper describes a more complex heuristic... closest-M works well
//! in practice"), grounded on `select_neighbours_heuristic` in the
//! `deven96-ahnlich` similarity crate's HNSW implementation. Insertion is
//! parallelized over objects with `rayon`, matching that crate's use of a
//! work-stealing pool for concurrent graph mutation, in place of the
//! teacher's single-threaded `HnswBuilder::add`.

use std::sync::Arc;

use rayon::prelude::*;

use crate::config::HnswParams;
use crate::error::Result;
use crate::heap::{CandidateHeap, NeighborHeap};
use crate::rng;
use crate::space::Space;

use super::graph::Graph;

/// A candidate produced during beam search, kept sorted ascending by
/// distance to the node being inserted.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: u32,
    dist: f32,
}

/// Build a complete HNSW [`Graph`] over every object in `space`.
///
/// Levels are sampled once per object from `params.seed` before any
/// insertion starts (§4.F: `level = floor(-ln(u) * mL)`), so the per-node
/// level assignment is reproducible independent of how insertion work is
/// scheduled across threads; edge formation itself is not (§5: "the final
/// graph is not deterministic across thread counts").
#[tracing::instrument(skip_all, fields(n = space.len(), m = params.m, ef_construction = params.ef_construction))]
pub fn build(space: Arc<dyn Space>, params: HnswParams) -> Result<Graph> {
    params.validate()?;
    let n = space.len();
    let levels = sample_levels(n, params.seed, params.m_l);
    let graph = Graph::with_levels(params, &levels);

    if n == 0 {
        return Ok(graph);
    }

    (0..n as u32)
        .into_par_iter()
        .try_for_each(|id| insert(&graph, space.as_ref(), id, levels[id as usize]))?;

    tracing::debug!("insertion complete, restoring edge symmetry");
    symmetrize(&graph, space.as_ref())?;

    Ok(graph)
}

/// Restores full edge symmetry once the graph is quiescent (P3). During
/// build, re-applying the neighbor-selection heuristic to shrink a
/// neighbor's list back under `max_conn` can occasionally prune away the
/// very edge that was just added on the far side, leaving a one-directional
/// edge behind — §3 only requires tolerating that *during* concurrent
/// insertion, not after. This pass adds any missing reverse edge, evicting
/// the single worst existing entry (by distance to the node being fixed,
/// never the edge being restored) if that would exceed capacity.
fn symmetrize(graph: &Graph, space: &dyn Space) -> Result<()> {
    for x in 0..graph.len() as u32 {
        for layer in 0..=graph.top_layer(x) {
            for y in graph.neighbors(x, layer) {
                let mut back = graph.neighbors(y, layer);
                if back.contains(&x) {
                    continue;
                }
                let cap = graph.max_conn(layer);
                if back.len() >= cap {
                    let mut worst_idx = 0;
                    let mut worst_dist = f32::NEG_INFINITY;
                    for (i, &n) in back.iter().enumerate() {
                        let d = space.distance_index(y, n)?;
                        if d > worst_dist {
                            worst_dist = d;
                            worst_idx = i;
                        }
                    }
                    back.swap_remove(worst_idx);
                }
                back.push(x);
                graph.set_neighbors(y, layer, back);
            }
        }
    }
    Ok(())
}

fn sample_levels(n: usize, seed: u64, m_l: f32) -> Vec<u8> {
    (0..n)
        .map(|id| {
            let mut rng = rng::thread_rng(seed, id as u64);
            let u = rng.f32().max(f32::MIN_POSITIVE);
            ((-u.ln() * m_l) as usize).min(32) as u8
        })
        .collect()
}

fn insert(graph: &Graph, space: &dyn Space, id: u32, level: u8) -> Result<()> {
    let (entry, ep_layer) = match graph.install_entry_point_if_absent(id, level) {
        None => return Ok(()), // first node in the graph
        Some(ep) => ep,
    };
    let mut ep = entry;
    let mut ep_dist = space.distance_index(id, ep)?;

    // Step 3: greedy descent down to level+1, one candidate tracked.
    for layer in (level + 1..=ep_layer).rev() {
        let (next, next_dist) = greedy_descend(graph, space, id, ep, ep_dist, layer)?;
        ep = next;
        ep_dist = next_dist;
    }

    // Step 4: beam search + neighbor selection from min(level, ep_layer) down to 0.
    let top = level.min(ep_layer);
    for layer in (0..=top).rev() {
        let candidates = search_layer_beam(
            graph,
            space,
            id,
            ep,
            ep_dist,
            graph.params().ef_construction,
            layer,
        )?;

        let m = graph.max_conn(layer);
        let chosen = select_neighbors(space, &candidates, m, graph.params().extend_with_rejects)?;

        graph.set_neighbors(id, layer, chosen.clone());
        for &n in &chosen {
            graph.add_neighbor_if_room(n, layer, id);
            shrink_if_over_capacity(graph, space, n, layer)?;
        }

        if let Some(best) = candidates.first() {
            ep = best.id;
            ep_dist = best.dist;
        }
    }

    if level > ep_layer {
        graph.promote_entry_point(id, level);
    }

    Ok(())
}

fn greedy_descend(
    graph: &Graph,
    space: &dyn Space,
    query_id: u32,
    mut ep: u32,
    mut ep_dist: f32,
    layer: u8,
) -> Result<(u32, f32)> {
    loop {
        let mut improved = false;
        for n in graph.neighbors(ep, layer) {
            let d = space.distance_index(query_id, n)?;
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

/// Bounded best-first beam search at `layer`, returning candidates sorted
/// ascending by distance to `query_id` (§4.F step 4).
fn search_layer_beam(
    graph: &Graph,
    space: &dyn Space,
    query_id: u32,
    entry: u32,
    entry_dist: f32,
    ef: usize,
    layer: u8,
) -> Result<Vec<Candidate>> {
    let mut visited = std::collections::HashSet::new();
    visited.insert(entry);

    let mut heap = NeighborHeap::new(ef.max(1));
    heap.try_push(entry_dist, entry);

    let mut candidates = CandidateHeap::new();
    candidates.push(entry_dist, entry);

    while let Some((cur_dist, cur_id)) = candidates.pop_min() {
        if heap.is_full() {
            if let Some((worst, _)) = heap.peek_worst() {
                if cur_dist > worst {
                    break;
                }
            }
        }

        for n in graph.neighbors(cur_id, layer) {
            if !visited.insert(n) {
                continue;
            }
            let d = space.distance_index(query_id, n)?;
            if heap.try_push(d, n) {
                candidates.push(d, n);
            }
        }
    }

    Ok(heap
        .drain_sorted_ascending()
        .into_iter()
        .map(|(dist, id)| Candidate { id, dist })
        .collect())
}

/// The neighbor-selection heuristic (§4.F): admits `c` into the result
/// only if it is closer to `query_id` than to every already-admitted
/// neighbor, favoring diverse directions over a naive closest-`m`.
fn select_neighbors(
    space: &dyn Space,
    candidates: &[Candidate],
    m: usize,
    extend_with_rejects: bool,
) -> Result<Vec<u32>> {
    let mut selected: Vec<Candidate> = Vec::with_capacity(m);
    let mut rejected: Vec<Candidate> = Vec::new();

    for &c in candidates {
        if selected.len() >= m {
            break;
        }
        let mut admit = true;
        for &r in &selected {
            if space.distance_index(c.id, r.id)? <= c.dist {
                admit = false;
                break;
            }
        }
        if admit {
            selected.push(c);
        } else {
            rejected.push(c);
        }
    }

    if extend_with_rejects {
        for c in rejected {
            if selected.len() >= m {
                break;
            }
            selected.push(c);
        }
    }

    Ok(selected.into_iter().map(|c| c.id).collect())
}

/// Re-apply the heuristic to `node`'s neighbor list at `layer` if it now
/// exceeds `max_conn(layer)`, keeping `just_added` distance-ranked against
/// `node` like every other member (§4.F step 4: "re-apply the heuristic to
/// shrink n's list back to max_conn(l)").
fn shrink_if_over_capacity(graph: &Graph, space: &dyn Space, node: u32, layer: u8) -> Result<()> {
    let cap = graph.max_conn(layer);
    let current = graph.neighbors(node, layer);
    if current.len() <= cap {
        return Ok(());
    }

    let mut candidates = Vec::with_capacity(current.len());
    for &id in &current {
        candidates.push(Candidate { id, dist: space.distance_index(node, id)? });
    }
    candidates.sort_by(|a, b| a.dist.partial_cmp(&b.dist).unwrap_or(std::cmp::Ordering::Equal));

    let shrunk = select_neighbors(space, &candidates, cap, true)?;
    graph.set_neighbors(node, layer, shrunk);
    Ok(())
}
