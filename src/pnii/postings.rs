//! PNII posting-list construction (§4.I).
//!
//! For each object, the `K_idx` closest pivots are found and the object's
//! id appended to each of their posting lists. Build is parallelized over
//! objects with `rayon`; each worker computes its object's pivot prefix
//! without coordination and only takes a short per-pivot lock to append,
//! matching §4.I's "single-writer per-pivot append (under a short lock)"
//! — the PNII analogue of the HNSW builder's per-node locks, grounded on
//! the same `parking_lot::Mutex` discipline the teacher uses for
//! segment-level coordination. The append-then-sort shape (rather than
//! requiring strict insertion order) follows the spec's explicit
//! allowance: "the final sort guarantees the invariant".

use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::config::PniiBuildParams;
use crate::error::Result;
use crate::space::Space;

use super::pivots::PivotSet;

/// Posting lists for every pivot, each sorted ascending by object id.
pub struct Postings {
    lists: Vec<Vec<u32>>,
    num_pivot_index: usize,
}

impl Postings {
    pub fn num_pivot_index(&self) -> usize {
        self.num_pivot_index
    }

    pub fn list(&self, pivot_index: usize) -> &[u32] {
        &self.lists[pivot_index]
    }

    pub fn num_pivots(&self) -> usize {
        self.lists.len()
    }

    pub fn from_lists(lists: Vec<Vec<u32>>, num_pivot_index: usize) -> Self {
        Self { lists, num_pivot_index }
    }

    pub fn into_lists(self) -> Vec<Vec<u32>> {
        self.lists
    }
}

/// For object `o`, the indices (into `pivots`) of its `K_idx` closest
/// pivots by `distance_index`, in no particular order (§3: "the prefix...
/// is the set... without order").
fn pivot_prefix(space: &dyn Space, pivots: &PivotSet, object: u32, k_idx: usize) -> Result<Vec<usize>> {
    let mut ranked: Vec<(f32, usize)> = Vec::with_capacity(pivots.len());
    for (idx, &pivot_id) in pivots.ids().iter().enumerate() {
        ranked.push((space.distance_index(pivot_id, object)?, idx));
    }
    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(k_idx);
    Ok(ranked.into_iter().map(|(_, idx)| idx).collect())
}

pub fn build(space: Arc<dyn Space>, pivots: &PivotSet, params: PniiBuildParams) -> Result<Postings> {
    params.validate()?;
    let locked_lists: Vec<Mutex<Vec<u32>>> = (0..pivots.len()).map(|_| Mutex::new(Vec::new())).collect();

    (0..space.len() as u32).into_par_iter().try_for_each(|object| -> Result<()> {
        let prefix = pivot_prefix(space.as_ref(), pivots, object, params.num_pivot_index)?;
        for pivot_idx in prefix {
            locked_lists[pivot_idx].lock().push(object);
        }
        Ok(())
    })?;

    let lists: Vec<Vec<u32>> = locked_lists
        .into_iter()
        .map(|m| {
            let mut v = m.into_inner();
            v.sort_unstable();
            v
        })
        .collect();

    Ok(Postings::from_lists(lists, params.num_pivot_index))
}
