//! Pivot sampling (§3 Pivot set, §4.H).
//!
//! `P` distinct object ids drawn without replacement via seeded
//! Fisher-Yates, the standard unbiased way to sample a fixed-size subset
//! from `[0, N)` with a single deterministic PRNG stream (§4.H: "Fisher-Yates
//! sampling... using a seeded PRNG").

use crate::error::{Error, Result};
use crate::rng;

/// An ordered, immutable list of `P` pivot object ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotSet {
    ids: Vec<u32>,
}

impl PivotSet {
    /// Sample `num_pivots` distinct ids from `[0, n)` using `seed`.
    pub fn sample(n: usize, num_pivots: usize, seed: u64) -> Result<Self> {
        if num_pivots > n {
            return Err(Error::param(
                "num_pivots",
                format!("cannot sample {num_pivots} pivots from {n} objects"),
            ));
        }

        let mut pool: Vec<u32> = (0..n as u32).collect();
        let mut rng = rng::thread_rng(seed, u64::MAX); // reserved thread index for pivot sampling

        // Partial Fisher-Yates: only shuffle the prefix we need.
        for i in 0..num_pivots {
            let j = i + rng.usize(0..(n - i));
            pool.swap(i, j);
        }
        pool.truncate(num_pivots);

        Ok(Self { ids: pool })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn from_ids(ids: Vec<u32>) -> Self {
        Self { ids }
    }
}
