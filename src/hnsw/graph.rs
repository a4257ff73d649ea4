//! The HNSW graph store (§4.E).
//!
//! A contiguous arena of per-node records, each node protected by its own
//! `parking_lot::Mutex` rather than one lock per index. This keeps the
//! teacher's "contiguous arena, 32-bit ids as handles" shape from
//! `hnsw.rs` but replaces its CSR layout (rebuilt wholesale after every
//! insert) with independently mutable per-node slots, since the spec
//! requires concurrent insertion under per-node locks rather than a
//! build-then-freeze CSR pass.
//!
//! Readers are allowed to observe a neighbor list mid-write: a writer only
//! ever replaces the whole `Vec<u32>` behind the lock, so a reader that
//! takes the lock briefly to clone the list never sees a torn individual
//! id, only a possibly-stale list. Search treats every neighbor id as a
//! hypothesis and re-derives its distance, so staleness is harmless (§4.E).

use parking_lot::Mutex;

use crate::config::HnswParams;

struct NodeRecord {
    top_layer: u8,
    /// `layers[l]` holds the neighbor ids at layer `l`, `l` in `0..=top_layer`.
    layers: Vec<Mutex<Vec<u32>>>,
}

/// The mutable multi-layer proximity graph built by [`super::builder::HnswBuilder`]
/// and queried by [`super::search::HnswSearcher`].
pub struct Graph {
    nodes: Vec<NodeRecord>,
    entry_point: Mutex<Option<(u32, u8)>>,
    params: HnswParams,
}

impl Graph {
    /// Allocate an empty arena sized for `capacity` nodes, each already
    /// assigned the `top_layer` computed for it before insertion begins
    /// (§4.F: levels are sampled once per node; the arena itself never
    /// grows during build, only the per-layer neighbor lists fill in).
    pub fn with_levels(params: HnswParams, levels: &[u8]) -> Self {
        let nodes = levels
            .iter()
            .map(|&top_layer| NodeRecord {
                top_layer,
                layers: (0..=top_layer).map(|_| Mutex::new(Vec::new())).collect(),
            })
            .collect();
        Self {
            nodes,
            entry_point: Mutex::new(None),
            params,
        }
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top_layer(&self, id: u32) -> u8 {
        self.nodes[id as usize].top_layer
    }

    /// Current entry point and its top layer, if the graph has one.
    pub fn entry_point(&self) -> Option<(u32, u8)> {
        *self.entry_point.lock()
    }

    /// Install `id` as the entry point if none exists yet. Returns the
    /// entry point that existed (or now exists) — `None` only if this
    /// call installed `id` itself.
    pub fn install_entry_point_if_absent(&self, id: u32, top_layer: u8) -> Option<(u32, u8)> {
        let mut ep = self.entry_point.lock();
        match *ep {
            Some(current) => Some(current),
            None => {
                *ep = Some((id, top_layer));
                None
            }
        }
    }

    /// Promote `id` to entry point if its layer exceeds the current one
    /// (§4.F step 5: "atomically promote").
    pub fn promote_entry_point(&self, id: u32, top_layer: u8) {
        let mut ep = self.entry_point.lock();
        let should_promote = match *ep {
            None => true,
            Some((_, cur_layer)) => top_layer > cur_layer,
        };
        if should_promote {
            *ep = Some((id, top_layer));
        }
    }

    /// Snapshot of `id`'s neighbor list at `layer`. `layer > top_layer(id)`
    /// yields an empty list.
    pub fn neighbors(&self, id: u32, layer: u8) -> Vec<u32> {
        let node = &self.nodes[id as usize];
        if layer as usize >= node.layers.len() {
            return Vec::new();
        }
        node.layers[layer as usize].lock().clone()
    }

    /// Replace `id`'s neighbor list at `layer` wholesale. No-op if
    /// `layer > top_layer(id)`.
    pub fn set_neighbors(&self, id: u32, layer: u8, neighbors: Vec<u32>) {
        let node = &self.nodes[id as usize];
        if (layer as usize) < node.layers.len() {
            *node.layers[layer as usize].lock() = neighbors;
        }
    }

    /// Append `id` to `target`'s neighbor list at `layer` if it is not
    /// already present, without exceeding `max_conn(layer)` — used for the
    /// simple "other side" of a bidirectional edge before the owning side
    /// re-applies the heuristic to shrink back down (§4.F step 4).
    pub fn add_neighbor_if_room(&self, target: u32, layer: u8, candidate: u32) -> bool {
        let node = &self.nodes[target as usize];
        if layer as usize >= node.layers.len() {
            return false;
        }
        let mut list = node.layers[layer as usize].lock();
        if list.contains(&candidate) || candidate == target {
            return false;
        }
        list.push(candidate);
        true
    }

    pub fn max_conn(&self, layer: u8) -> usize {
        self.params.max_conn(layer as usize)
    }

    /// Iterate `(id, layer, neighbors)` for every node and layer — used by
    /// property tests (P1-P3) and the persistence writer.
    pub fn iter_layers(&self) -> impl Iterator<Item = (u32, u8, Vec<u32>)> + '_ {
        self.nodes.iter().enumerate().flat_map(|(id, node)| {
            let id = id as u32;
            (0..node.layers.len()).map(move |l| (id, l as u8, ()))
        }).map(move |(id, l, ())| (id, l, self.neighbors(id, l)))
    }
}
