//! Bounded max-heap over `(distance, id)` pairs (§4.C).
//!
//! Shared by the HNSW searcher's `W` set, the HNSW builder's candidate
//! selection, and the PNII planner's final top-`k` re-rank — the same
//! `Entry`/`BinaryHeap<Entry>` shape the teacher's `hnsw.rs` used for its
//! per-layer candidate set, generalized into a standalone, reusable type
//! instead of being inlined into the search routine.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A `(distance, id)` pair ordered so that `BinaryHeap`'s natural max-heap
/// behavior surfaces the *worst* entry at the top: larger distance is
/// "greater", and for equal distances a larger id is "greater" (worse),
/// so `try_push` always keeps the smaller id on a tie (§4.C: "tie-break on
/// id to keep results deterministic").
#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    dist: f32,
    id: u32,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A max-heap bounded to capacity `k` over `(distance, id)` pairs.
///
/// Invariant (§4.C): after any sequence of operations the heap contains the
/// `k` best entries seen so far with respect to ascending distance.
#[derive(Debug, Clone)]
pub struct NeighborHeap {
    capacity: usize,
    heap: BinaryHeap<Entry>,
}

impl NeighborHeap {
    /// Create an empty heap with the given capacity. `capacity == 0` is
    /// legal and degenerates to a heap that never accepts anything.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// The worst (largest-distance) entry currently held, if any.
    pub fn peek_worst(&self) -> Option<(f32, u32)> {
        self.heap.peek().map(|e| (e.dist, e.id))
    }

    /// Attempt to insert `(dist, id)`. Returns `true` if the entry was
    /// admitted (either there was spare capacity, or it displaced the
    /// current worst entry).
    pub fn try_push(&mut self, dist: f32, id: u32) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let candidate = Entry { dist, id };
        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
            return true;
        }
        // Safe: capacity > 0 and len >= capacity implies non-empty.
        let worst = *self.heap.peek().expect("heap non-empty at capacity");
        if candidate < worst {
            self.heap.pop();
            self.heap.push(candidate);
            true
        } else {
            false
        }
    }

    /// Drain the heap, producing `(distance, id)` pairs in ascending
    /// distance order (ties broken by ascending id).
    pub fn drain_sorted_ascending(&mut self) -> Vec<(f32, u32)> {
        let mut out: Vec<Entry> = std::mem::take(&mut self.heap).into_vec();
        out.sort_unstable_by(|a, b| a.cmp(b));
        out.into_iter().map(|e| (e.dist, e.id)).collect()
    }

    /// Non-destructive view of the current contents in ascending distance
    /// order. Used where the heap must keep accepting pushes afterward.
    pub fn iter_sorted_ascending(&self) -> Vec<(f32, u32)> {
        let mut out: Vec<Entry> = self.heap.iter().copied().collect();
        out.sort_unstable_by(|a, b| a.cmp(b));
        out.into_iter().map(|e| (e.dist, e.id)).collect()
    }
}

/// Unbounded min-heap over `(distance, id)` pairs — the beam search
/// frontier `C` of §4.G step 2 ("pop the candidate nearest the query"),
/// which must always yield its true minimum rather than evict a worst
/// entry at capacity the way [`NeighborHeap`] does.
#[derive(Debug, Clone)]
pub struct CandidateHeap {
    heap: BinaryHeap<Reverse<Entry>>,
}

impl CandidateHeap {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new() }
    }

    pub fn push(&mut self, dist: f32, id: u32) {
        self.heap.push(Reverse(Entry { dist, id }));
    }

    /// Remove and return the nearest (smallest-distance) candidate.
    pub fn pop_min(&mut self) -> Option<(f32, u32)> {
        self.heap.pop().map(|Reverse(e)| (e.dist, e.id))
    }
}

impl Default for CandidateHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_heap_pops_ascending() {
        let mut h = CandidateHeap::new();
        for (d, id) in [(5.0, 0), (1.0, 1), (4.0, 2), (2.0, 3), (3.0, 4)] {
            h.push(d, id);
        }
        let mut out = Vec::new();
        while let Some(entry) = h.pop_min() {
            out.push(entry);
        }
        assert_eq!(out, vec![(1.0, 1), (2.0, 3), (3.0, 4), (4.0, 2), (5.0, 0)]);
    }

    #[test]
    fn keeps_k_smallest() {
        let mut h = NeighborHeap::new(3);
        for (d, id) in [(5.0, 0), (1.0, 1), (4.0, 2), (2.0, 3), (3.0, 4)] {
            h.try_push(d, id);
        }
        assert_eq!(h.drain_sorted_ascending(), vec![(1.0, 1), (2.0, 3), (3.0, 4)]);
    }

    #[test]
    fn tie_break_prefers_smaller_id() {
        let mut h = NeighborHeap::new(1);
        assert!(h.try_push(1.0, 5));
        // Equal distance, larger id should not displace the smaller id.
        assert!(!h.try_push(1.0, 9));
        // Equal distance, smaller id should displace the larger id.
        let mut h2 = NeighborHeap::new(1);
        assert!(h2.try_push(1.0, 9));
        assert!(h2.try_push(1.0, 5));
        assert_eq!(h2.drain_sorted_ascending(), vec![(1.0, 5)]);
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut h = NeighborHeap::new(0);
        assert!(!h.try_push(1.0, 0));
        assert!(h.is_empty());
    }

    #[test]
    fn property_matches_sorted_prefix() {
        // P4: for any stream of inserts with capacity k, drained output
        // equals the k smallest (dist, id) pairs in lexicographic order.
        let mut rng = fastrand::Rng::with_seed(123);
        for _ in 0..20 {
            let n = rng.usize(1..50);
            let k = rng.usize(1..20);
            let mut items: Vec<(f32, u32)> = (0..n)
                .map(|i| ((rng.u32(0..1000) as f32) / 10.0, i as u32))
                .collect();
            let mut h = NeighborHeap::new(k);
            for &(d, id) in &items {
                h.try_push(d, id);
            }
            items.sort_by(|a, b| a.partial_cmp(b).unwrap());
            items.truncate(k);
            assert_eq!(h.drain_sorted_ascending(), items);
        }
    }
}
