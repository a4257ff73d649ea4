//! Seeded, per-thread pseudo-random state.
//!
//! The only process-scoped knob in the core is a master seed (§5: "The RNG
//! seed is the only process-scoped 'knob'; pass it explicitly through
//! builders"). Every thread that needs randomness — HNSW level sampling
//! during build, Fisher-Yates pivot selection — derives its own
//! [`fastrand::Rng`] from `master_seed` and a thread index, so that a
//! single-threaded build with a fixed seed is fully reproducible, while a
//! multi-threaded build only has to reason about interleaving, not about a
//! shared mutable RNG.

/// Derives a per-thread seed from a master seed and a thread index.
///
/// Uses a simple mixing step (splitmix64-style) so that nearby thread
/// indices don't produce correlated streams.
fn derive_seed(master_seed: u64, thread_index: u64) -> u64 {
    let mut z = master_seed
        .wrapping_add(thread_index.wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Construct a [`fastrand::Rng`] for a given master seed and thread index.
pub fn thread_rng(master_seed: u64, thread_index: u64) -> fastrand::Rng {
    fastrand::Rng::with_seed(derive_seed(master_seed, thread_index))
}
