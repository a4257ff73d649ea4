//! annsearch - a generic approximate nearest-neighbor search core
//!
//! `annsearch` indexes opaque byte-blob objects under a caller-supplied
//! [`Space`](space::Space) and answers k-nearest-neighbor and range queries
//! against two index strategies: an HNSW proximity graph, and a
//! Pivot-Neighborhood Inverted Index (PNII). A brute-force [`ExactScan`]
//! serves as the ground-truth oracle for recall measurement.
//!
//! # Core Philosophy
//!
//! - **Space-agnostic**: the core never assumes a metric, only that some
//!   notion of "distance" exists; query-time and index-time distance can
//!   even differ for the same pair of objects.
//! - **Deterministic build**: a fixed master seed reproduces the same level
//!   assignment and pivot sampling regardless of how work is scheduled
//!   across threads.
//! - **No hidden I/O**: persistence is an explicit, versioned binary format
//!   with a checksum, not an implicit side effect of building an index.
//! - **Cancellation without errors**: a deadline reached mid-query yields a
//!   best-effort partial result, never an `Err`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use annsearch::config::HnswParams;
//! use annsearch::object::ObjectBufferBuilder;
//! use annsearch::space::{Metric, Space, VectorSpace};
//! use annsearch::hnsw;
//!
//! # fn main() -> annsearch::error::Result<()> {
//! let mut builder = ObjectBufferBuilder::new();
//! builder.push(&[0u8; 16], Some("first".into()))?;
//! let objects = builder.build();
//!
//! let space: Arc<dyn Space> = Arc::new(VectorSpace::new(objects, 4, Metric::Euclidean)?);
//! let graph = hnsw::build(space.clone(), HnswParams::with_m(16))?;
//! let searcher = hnsw::HnswSearcher::new(&graph, space.as_ref());
//! let query = [0u8; 16];
//! let results = searcher.knn_query(&query, 5, 50, None)?.into_inner();
//! # let _ = results;
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod heap;
pub mod hnsw;
pub mod index;
pub mod loader;
pub mod object;
pub mod pnii;
pub mod rng;
pub mod simd;
pub mod space;
pub mod visited;

pub use config::{HnswParams, PniiBuildParams, PniiSearchParams, SearchParams};
pub use error::{Error, Result};
pub use heap::NeighborHeap;
pub use hnsw::{HnswSearcher, Outcome};
pub use index::{ExactScan, HnswIndex, Index, PniiIndex};
pub use object::{ObjectBuffer, ObjectBufferBuilder};
pub use pnii::{Accumulator, PivotSet, PniiPlanner, Postings};
pub use space::{Metric, Space, VectorSpace};
