//! metaxy: hybrid scalar-filtered approximate nearest-neighbour search.
//!
//! An in-memory index for queries of the form *"the k vectors closest to
//! `v` whose attached scalar lies in `[smin, smax]`"*. Write-once /
//! read-many with incremental inserts; squared Euclidean distance
//! throughout.
//!
//! # How a query runs
//!
//! Two auxiliary structures are kept in lockstep by [`HybridIndex::insert`]:
//!
//! - an **augmented B+ tree** ([`btree::BPlusTree`]) keyed by the scalar,
//!   whose per-node subtree counts answer `count(s in [lo, hi])` in
//!   `O(log n)`;
//! - a **neighbour backend** ([`backend::AnnBackend`]) over the vectors —
//!   an incremental small-world graph by default, exhaustive scan as the
//!   exact drop-in.
//!
//! The planner first asks the tree how many records pass the filter:
//!
//! | Filter-passing count S | Plan |
//! |------------------------|------|
//! | 0 | empty result, no vector work |
//! | small (below the candidate budget) | enumerate the range through the tree, rank exactly |
//! | large | over-fetch neighbours from the backend, drop out-of-range, rank |
//!
//! In the probabilistic path ([`HybridIndex::query_prob`]) the over-fetch
//! size is solved from a binomial tail bound ([`sizing`]) so that fewer
//! than `k` survivors has probability at most `alpha` — under an
//! independence assumption that is deliberately optimistic and padded with
//! a safety margin. Treat `alpha` as a dial, not a guarantee.
//!
//! # Example
//!
//! ```rust
//! use metaxy::HybridIndex;
//!
//! # fn main() -> metaxy::Result<()> {
//! let mut index = HybridIndex::new(32)?;
//! for i in 0..100u32 {
//!     let v = [i as f32, (i % 10) as f32];
//!     index.insert(&v, i as f32)?;
//! }
//!
//! // 5 nearest to [40, 4] among records with scalar in [30, 60].
//! let hits = index.query_prob(&[40.0, 4.0], 5, 30.0, 60.0, 0.01)?;
//! assert!(hits.len() <= 5);
//! # Ok(())
//! # }
//! ```
//!
//! Returning fewer than `k` ids — because the range holds fewer than `k`
//! records, or the filter ate the candidates — is a legal success, never
//! an error.
//!
//! # Non-goals
//!
//! Persistence, concurrent writers, per-value deletion (only whole-key
//! [`btree::BPlusTree::remove`]), and exact-kNN guarantees on the
//! approximate path.

pub mod backend;
pub mod btree;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod index;
pub mod planner;
pub mod sizing;
pub mod store;

pub use backend::hnsw::{HnswBackend, HnswParams};
pub use backend::{AnnBackend, BruteForceBackend};
pub use btree::BPlusTree;
pub use error::{IndexError, Result};
pub use index::{HybridIndex, IndexConfig, DEFAULT_ALPHA};
pub use store::RecordStore;
