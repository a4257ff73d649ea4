//! SIMD-accelerated vector arithmetic, ported from the teacher's
//! `distance.rs`. Used by [`crate::space::VectorSpace`]; kept as a
//! standalone module so the arithmetic and the `Space` wiring can be
//! tested independently, as the teacher did.
//!
//! Uses `f32x8` from the `wide` crate for portable 8-wide SIMD (AVX2,
//! AVX-512, NEON), falling back to scalar arithmetic for the remainder.

/// Dot product: `sum(a[i] * b[i])`.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dim = a.len();
    let mut sum = wide::f32x8::ZERO;

    let chunks = dim / 8;
    for i in 0..chunks {
        let offset = i * 8;
        let va = wide::f32x8::from(&a[offset..offset + 8]);
        let vb = wide::f32x8::from(&b[offset..offset + 8]);
        sum += va * vb;
    }

    let mut result: f32 = sum.to_array().iter().sum();

    let remainder = dim % 8;
    if remainder > 0 {
        let start = chunks * 8;
        for i in 0..remainder {
            result += a[start + i] * b[start + i];
        }
    }

    result
}

/// Cosine similarity: `dot(a, b) / (||a|| * ||b||)`, range `[-1, 1]`.
/// Returns `0.0` if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot = dot_product(a, b);
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Euclidean (L2) distance: `sqrt(sum((a[i] - b[i])^2))`.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dim = a.len();
    let mut sum = wide::f32x8::ZERO;

    let chunks = dim / 8;
    for i in 0..chunks {
        let offset = i * 8;
        let va = wide::f32x8::from(&a[offset..offset + 8]);
        let vb = wide::f32x8::from(&b[offset..offset + 8]);
        let diff = va - vb;
        sum += diff * diff;
    }

    let mut result: f32 = sum.to_array().iter().sum();

    let remainder = dim % 8;
    if remainder > 0 {
        let start = chunks * 8;
        for i in 0..remainder {
            let diff = a[start + i] - b[start + i];
            result += diff * diff;
        }
    }

    result.sqrt()
}

fn l2_norm(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}

/// Scalar fallbacks, used by tests to check the SIMD paths agree.
pub mod scalar {
    pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot = dot_product(a, b);
        let norm_a = l2_norm(a);
        let norm_b = l2_norm(b);
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
        let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
        sum.sqrt()
    }

    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }
}
