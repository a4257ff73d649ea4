//! The `Space` abstraction (§3 Space, §4.A).
//!
//! Both HNSW and PNII are built against this trait rather than a concrete
//! vector type, so the same graph/index code serves dense float vectors,
//! asymmetric similarity measures, or any other comparable object the
//! caller can express as a byte blob in an [`ObjectBuffer`]. This
//! generalizes the teacher's `Distance` enum (`hnsw.rs`/`distance.rs`),
//! which only spoke of a single symmetric metric over `&[f32]`, into a
//! trait with separate index-time and query-time distances, matching §4.A's
//! requirement that a space need not be a metric at all (no triangle
//! inequality, no symmetry).
//!
//! Distances returned by a `Space` must be finite; callers that detect a
//! `NaN` or infinite result should surface [`Error::NonFiniteDistance`].

use crate::error::{Error, Result};
use crate::object::ObjectBuffer;
use crate::simd;

/// A comparable collection of objects.
///
/// `distance_index(a, b)` is used whenever both `a` and `b` are indexed
/// objects (graph construction, pivot assignment). `distance_query(q, b)`
/// is used when `q` is a query presented at search time and `b` is an
/// indexed object; for symmetric spaces the two coincide, but a `Space` is
/// free to treat them differently (§4.A, end-to-end scenario 5).
pub trait Space: Send + Sync {
    /// Distance between two already-indexed objects.
    fn distance_index(&self, a: u32, b: u32) -> Result<f32>;

    /// Distance between a query (presented as raw bytes, in the same
    /// encoding as an indexed object) and an already-indexed object.
    fn distance_query(&self, query: &[u8], b: u32) -> Result<f32>;

    /// Number of objects currently indexed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A cheap lower-bound or correlated proxy for `distance_index`, used
    /// by PNII's candidate-generation pass to cut comparisons before the
    /// true-distance re-rank (§4.J). The default is the true distance
    /// itself, i.e. no speedup, which is always a valid (if unhelpful)
    /// choice.
    fn proxy_distance(&self, a: u32, b: u32) -> Result<f32> {
        self.distance_index(a, b)
    }
}

/// The concrete metric a [`VectorSpace`] computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `1 - cosine_similarity`, range `[0, 2]`.
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
    /// Negative dot product, so that "more similar" still means "smaller
    /// distance" for the max-heap-based search routines.
    NegDotProduct,
}

/// A [`Space`] over fixed-width `f32` vectors stored in an [`ObjectBuffer`],
/// backed by the SIMD routines in [`crate::simd`]. This is the workhorse
/// space for dense embeddings, generalizing the teacher's single
/// `Distance` enum into one of several `Space` implementations the crate
/// ships.
pub struct VectorSpace {
    objects: ObjectBuffer,
    dim: usize,
    metric: Metric,
}

impl VectorSpace {
    /// Wrap `objects` as a vector space of the given `dim` and `metric`.
    /// Every object's byte length must equal `dim * size_of::<f32>()`.
    pub fn new(objects: ObjectBuffer, dim: usize, metric: Metric) -> Result<Self> {
        let expected = dim * std::mem::size_of::<f32>();
        for id in 0..objects.len() as u32 {
            if objects.get(id).len() != expected {
                return Err(Error::format(format!(
                    "object {id} has {} bytes, expected {expected} for dim {dim}",
                    objects.get(id).len()
                )));
            }
        }
        Ok(Self { objects, dim, metric })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn decode(&self, bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn vector(&self, id: u32) -> Vec<f32> {
        self.decode(self.objects.get(id))
    }

    fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            Metric::Cosine => 1.0 - simd::cosine_similarity(a, b),
            Metric::Euclidean => simd::euclidean_distance(a, b),
            Metric::NegDotProduct => -simd::dot_product(a, b),
        }
    }

    fn check_finite(&self, d: f32, a: u32, b: u32) -> Result<f32> {
        if d.is_finite() {
            Ok(d)
        } else {
            Err(Error::NonFiniteDistance { a, b })
        }
    }
}

impl Space for VectorSpace {
    fn distance_index(&self, a: u32, b: u32) -> Result<f32> {
        let va = self.vector(a);
        let vb = self.vector(b);
        self.check_finite(self.compute(&va, &vb), a, b)
    }

    fn distance_query(&self, query: &[u8], b: u32) -> Result<f32> {
        let vq = self.decode(query);
        let vb = self.vector(b);
        self.check_finite(self.compute(&vq, &vb), u32::MAX, b)
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

/// A deliberately asymmetric space: indexed-to-indexed distance is negative
/// dot product, but query-to-indexed distance additionally penalizes by a
/// per-object bias term, so `distance_query(q, b) != distance_query(b, q)`
/// in general. Exists to exercise the asymmetric `distance_index` /
/// `distance_query` split end to end (§4.A, end-to-end scenario 5) — no
/// real embedding model works this way, but the shape (a bias or
/// popularity term folded into query-time scoring only) is common in
/// recommendation-style retrieval.
pub struct AsymmetricNegDotSpace {
    objects: ObjectBuffer,
    dim: usize,
    bias: Vec<f32>,
}

impl AsymmetricNegDotSpace {
    pub fn new(objects: ObjectBuffer, dim: usize, bias: Vec<f32>) -> Result<Self> {
        let expected = dim * std::mem::size_of::<f32>();
        if bias.len() != objects.len() {
            return Err(Error::param(
                "bias",
                "must have one entry per object",
            ));
        }
        for id in 0..objects.len() as u32 {
            if objects.get(id).len() != expected {
                return Err(Error::format(format!(
                    "object {id} has {} bytes, expected {expected} for dim {dim}",
                    objects.get(id).len()
                )));
            }
        }
        Ok(Self { objects, dim, bias })
    }

    fn decode(&self, bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn vector(&self, id: u32) -> Vec<f32> {
        self.decode(self.objects.get(id))
    }
}

impl Space for AsymmetricNegDotSpace {
    fn distance_index(&self, a: u32, b: u32) -> Result<f32> {
        let va = self.vector(a);
        let vb = self.vector(b);
        let d = -simd::dot_product(&va, &vb);
        if d.is_finite() {
            Ok(d)
        } else {
            Err(Error::NonFiniteDistance { a, b })
        }
    }

    fn distance_query(&self, query: &[u8], b: u32) -> Result<f32> {
        let vq = self.decode(query);
        let vb = self.vector(b);
        let d = -simd::dot_product(&vq, &vb) + self.bias[b as usize];
        if d.is_finite() {
            Ok(d)
        } else {
            Err(Error::NonFiniteDistance { a: u32::MAX, b })
        }
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectBufferBuilder;

    fn push_vec(b: &mut ObjectBufferBuilder, v: &[f32]) -> u32 {
        let bytes: Vec<u8> = v.iter().flat_map(|f| f.to_le_bytes()).collect();
        b.push(&bytes, None).unwrap()
    }

    #[test]
    fn euclidean_space_matches_simd() {
        let mut b = ObjectBufferBuilder::new();
        push_vec(&mut b, &[1.0, 2.0, 3.0]);
        push_vec(&mut b, &[4.0, 5.0, 6.0]);
        let space = VectorSpace::new(b.build(), 3, Metric::Euclidean).unwrap();
        let d = space.distance_index(0, 1).unwrap();
        assert!((d - simd::euclidean_distance(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0])).abs() < 1e-5);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut b = ObjectBufferBuilder::new();
        push_vec(&mut b, &[1.0, 2.0]);
        let err = VectorSpace::new(b.build(), 3, Metric::Euclidean);
        assert!(err.is_err());
    }

    #[test]
    fn asymmetric_space_is_not_symmetric() {
        let mut b = ObjectBufferBuilder::new();
        push_vec(&mut b, &[1.0, 0.0]);
        push_vec(&mut b, &[0.0, 1.0]);
        let space = AsymmetricNegDotSpace::new(b.build(), 2, vec![0.0, 5.0]).unwrap();
        let q0: Vec<u8> = [1.0f32, 0.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        let q1: Vec<u8> = [0.0f32, 1.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        let d_q0_to_1 = space.distance_query(&q0, 1).unwrap();
        let d_q1_to_0 = space.distance_query(&q1, 0).unwrap();
        assert_ne!(d_q0_to_1, d_q1_to_0);
    }
}
