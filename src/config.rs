//! Index parameters and their validation.
//!
//! Parameters are checked up front (`Error::Param`) rather than deep inside
//! a build or query, matching §7's policy that `ParamError` is "surfaced
//! before any work" — continuing the teacher's `HnswParams::with_m` /
//! `with_ef_construction` builder style from `hnsw.rs`.

use crate::error::{Error, Result};

/// HNSW index parameters (§4.F).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HnswParams {
    /// Target out-degree on upper layers (`M` in the spec).
    pub m: usize,
    /// Target out-degree on layer 0, typically `2M`.
    pub m0: usize,
    /// Beam width used during build (`efConstruction`).
    pub ef_construction: usize,
    /// Layer decay: `level = floor(-ln(u) * m_l)` for `u ~ Uniform(0,1)`.
    pub m_l: f32,
    /// Whether to fill unused neighbor slots from rejected candidates
    /// during the neighbor-selection heuristic (§4.F, §9: "on by default").
    pub extend_with_rejects: bool,
    /// Master RNG seed for level assignment (§3, §5).
    pub seed: u64,
}

impl HnswParams {
    /// Construct parameters from `M`, deriving the conventional defaults
    /// (`M0 = 2M`, `efConstruction = 2M`, `mL = 1/ln(M)`).
    pub fn with_m(m: usize) -> Self {
        Self {
            m,
            m0: m * 2,
            ef_construction: m * 2,
            m_l: 1.0 / (m as f32).ln(),
            extend_with_rejects: true,
            seed: 0,
        }
    }

    /// Override `efConstruction`.
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Override `M0` (default `2M`).
    pub fn with_m0(mut self, m0: usize) -> Self {
        self.m0 = m0;
        self
    }

    /// Override the master RNG seed (default `0`).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Disable filling unused neighbor slots from rejected candidates.
    pub fn without_reject_fill(mut self) -> Self {
        self.extend_with_rejects = false;
        self
    }

    /// Validate this configuration, returning `Error::Param` on the first
    /// violation found.
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(Error::param("m", "must be >= 2"));
        }
        if self.m0 < self.m {
            return Err(Error::param("m0", "must be >= m"));
        }
        if self.ef_construction < 1 {
            return Err(Error::param("ef_construction", "must be >= 1"));
        }
        if !self.m_l.is_finite() || self.m_l <= 0.0 {
            return Err(Error::param("m_l", "must be finite and > 0"));
        }
        Ok(())
    }

    pub(crate) fn max_conn(&self, layer: usize) -> usize {
        if layer == 0 { self.m0 } else { self.m }
    }
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::with_m(16)
    }
}

/// Parameters for searching an HNSW index (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Number of results requested.
    pub k: usize,
    /// Beam width at layer 0 (`ef >= k`).
    pub ef: usize,
}

impl SearchParams {
    /// Construct search parameters, clamping `ef` up to `k` if needed.
    pub fn new(k: usize, ef: usize) -> Self {
        Self { k, ef: ef.max(k) }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::param("k", "must be >= 1"));
        }
        if self.ef < self.k {
            return Err(Error::param("ef", "must be >= k"));
        }
        Ok(())
    }
}

/// PNII index-build parameters (§4.I).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PniiBuildParams {
    /// Number of pivots sampled at index time (`P`).
    pub num_pivots: usize,
    /// Prefix length at index time (`K_idx`, `num_pivot_index`).
    pub num_pivot_index: usize,
    /// Master RNG seed for pivot sampling (§3, §4.H).
    pub seed: u64,
}

impl PniiBuildParams {
    pub fn new(num_pivots: usize, num_pivot_index: usize) -> Self {
        Self {
            num_pivots,
            num_pivot_index,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_pivots == 0 {
            return Err(Error::param("num_pivots", "must be >= 1"));
        }
        if self.num_pivot_index == 0 || self.num_pivot_index > self.num_pivots {
            return Err(Error::param(
                "num_pivot_index",
                "must satisfy 1 <= num_pivot_index <= num_pivots",
            ));
        }
        Ok(())
    }
}

/// PNII query-time parameters (§4.J).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PniiSearchParams {
    /// Query prefix length (`K_srch`, `num_pivot_search`, `<= K_idx`).
    pub num_pivot_search: usize,
    /// Candidate cap as a fraction of `N` (`dbScanFrac`).
    pub db_scan_frac: f32,
    /// Minimum shared-pivot count required to admit a candidate.
    pub threshold: usize,
    /// Optional position-difference constraint (`maxPosDiff`). Disabled
    /// (effectively `P`) by default per §9's open question: the repository
    /// only retains index-time prefixes, so the check cannot be evaluated
    /// without a stored query-time permutation, and is silently skipped.
    pub max_pos_diff: Option<usize>,
}

impl PniiSearchParams {
    pub fn new(num_pivot_search: usize, db_scan_frac: f32) -> Self {
        Self {
            num_pivot_search,
            db_scan_frac,
            threshold: 1,
            max_pos_diff: None,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_pos_diff(mut self, max_pos_diff: usize) -> Self {
        self.max_pos_diff = Some(max_pos_diff);
        self
    }

    pub fn validate(&self, num_pivot_index: usize) -> Result<()> {
        if self.num_pivot_search == 0 || self.num_pivot_search > num_pivot_index {
            return Err(Error::param(
                "num_pivot_search",
                "must satisfy 1 <= num_pivot_search <= num_pivot_index",
            ));
        }
        if !(0.0..=1.0).contains(&self.db_scan_frac) {
            return Err(Error::param("db_scan_frac", "must be in [0, 1]"));
        }
        if self.threshold == 0 {
            return Err(Error::param("threshold", "must be >= 1"));
        }
        Ok(())
    }
}
