//! The hybrid index: scalar-filtered approximate nearest-neighbour search.
//!
//! [`HybridIndex`] owns the three structures a filtered query needs:
//!
//! - a [record store](crate::store::RecordStore) holding vectors and
//!   scalars by dense id;
//! - an [augmented B+ tree](crate::btree::BPlusTree) keyed by the scalar,
//!   answering `count(s in [lo, hi])` and range enumeration in `O(log n)`;
//! - an [ANN backend](crate::backend::AnnBackend) for approximate
//!   neighbour retrieval (an incremental small-world graph by default).
//!
//! `insert` fans a record out to all three. Queries go through the
//! [planner](crate::planner): either enumerate the scalar range and rank
//! exactly, or over-fetch neighbours (sized by [`crate::sizing`] in the
//! probabilistic path) and filter. Per-query diagnostics — the
//! filter-passing count and the chosen candidate budget — are emitted at
//! debug level.

use crate::backend::hnsw::{HnswBackend, HnswParams};
use crate::backend::AnnBackend;
use crate::btree::BPlusTree;
use crate::distance::l2_distance_squared;
use crate::error::{IndexError, Result};
use crate::planner::{self, QueryPlan};
use crate::sizing::SizingConfig;
use crate::store::RecordStore;

/// Default confidence target for [`HybridIndex::query_prob`]: at most a 1%
/// modelled chance of returning fewer than `k` matches.
pub const DEFAULT_ALPHA: f64 = 0.01;

/// Extra beam width added on top of the candidate budget when raising the
/// backend's search effort.
const EFFORT_HEADROOM: usize = 50;

/// Configuration for a [`HybridIndex`].
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// B+ tree branching parameter (must be at least 3).
    pub order: usize,
    /// Parameters for the default graph backend.
    pub hnsw: HnswParams,
    /// Candidate-sizing knobs for the probabilistic plan.
    pub sizing: SizingConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order: 32,
            hnsw: HnswParams::default(),
            sizing: SizingConfig::default(),
        }
    }
}

/// Builds a backend once the vector dimension is known (on first insert).
type BackendFactory = Box<dyn Fn(usize) -> Box<dyn AnnBackend>>;

/// Hybrid scalar-filtered ANN index.
///
/// Single-threaded; the index is a plain value and exclusively owns its
/// store, tree and backend. Multiple independent indices may coexist.
pub struct HybridIndex {
    store: RecordStore,
    tree: BPlusTree<f32, u32>,
    backend: Option<Box<dyn AnnBackend>>,
    factory: BackendFactory,
    default_effort: usize,
    sizing: SizingConfig,
}

impl HybridIndex {
    /// Create an index with a B+ tree of the given `order` and the default
    /// graph backend. Fails with `InvalidConfig` for `order < 3`.
    pub fn new(order: usize) -> Result<Self> {
        Self::with_config(IndexConfig {
            order,
            ..IndexConfig::default()
        })
    }

    /// Create an index from a full configuration.
    pub fn with_config(config: IndexConfig) -> Result<Self> {
        let hnsw = config.hnsw.clone();
        let default_effort = hnsw.ef_search;
        Ok(Self {
            store: RecordStore::new(),
            tree: BPlusTree::new(config.order)?,
            backend: None,
            factory: Box::new(move |dim| {
                Box::new(HnswBackend::new(dim, hnsw.clone())) as Box<dyn AnnBackend>
            }),
            default_effort,
            sizing: config.sizing,
        })
    }

    /// Create an index with a custom backend, built lazily on the first
    /// insert once the dimension is known.
    ///
    /// `default_effort` is the baseline the probabilistic path raises the
    /// backend's search effort from.
    pub fn with_backend<B, F>(order: usize, default_effort: usize, factory: F) -> Result<Self>
    where
        B: AnnBackend + 'static,
        F: Fn(usize) -> B + 'static,
    {
        Ok(Self {
            store: RecordStore::new(),
            tree: BPlusTree::new(order)?,
            backend: None,
            factory: Box::new(move |dim| Box::new(factory(dim)) as Box<dyn AnnBackend>),
            default_effort,
            sizing: SizingConfig::default(),
        })
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True before the first insert.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Vector dimension, or 0 before the first insert.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.store.dim()
    }

    /// Records whose scalar lies in `[smin, smax]`.
    #[must_use]
    pub fn count_in_range(&self, smin: f32, smax: f32) -> usize {
        self.tree.count_in_range(&smin, &smax)
    }

    /// Insert a record; the new id is the previous record count.
    ///
    /// Fails with `EmptyVector` or `DimensionMismatch`; a failed insert
    /// changes nothing.
    pub fn insert(&mut self, vector: &[f32], s: f32) -> Result<u32> {
        let id = self.store.insert(vector, s)?;
        self.tree.insert(s, id);
        let backend = self
            .backend
            .get_or_insert_with(|| (self.factory)(vector.len()));
        backend.add_point(vector, id);
        Ok(id)
    }

    /// Filtered k-NN with a caller-fixed candidate budget `o`.
    ///
    /// Scans the scalar range exactly when it holds fewer than `o` records,
    /// otherwise fetches `o` approximate neighbours and filters. Returns up
    /// to `k` ids; fewer than `k` is a legal outcome, not an error.
    pub fn query_fixed(
        &mut self,
        v: &[f32],
        k: usize,
        smin: f32,
        smax: f32,
        o: usize,
    ) -> Result<Vec<u32>> {
        self.check_query(v)?;

        let passing = self.tree.count_in_range(&smin, &smax);
        tracing::debug!(passing, "filter-passing count");
        if passing == 0 || k == 0 {
            return Ok(Vec::new());
        }

        match planner::plan_fixed(passing, o) {
            QueryPlan::RangeScan => Ok(self.run_range_scan(v, k, smin, smax)),
            QueryPlan::AnnFilter { candidates } => {
                Ok(self.run_ann_filter(v, k, smin, smax, candidates, false))
            }
        }
    }

    /// Filtered k-NN with a confidence target `alpha`.
    ///
    /// Always takes the ANN path; the candidate budget is sized so that the
    /// modelled probability of fewer than `k` survivors is at most `alpha`
    /// (see [`crate::sizing`] for why that model is optimistic). Use
    /// [`DEFAULT_ALPHA`] when in doubt.
    pub fn query_prob(
        &mut self,
        v: &[f32],
        k: usize,
        smin: f32,
        smax: f32,
        alpha: f64,
    ) -> Result<Vec<u32>> {
        self.check_query(v)?;

        let passing = self.tree.count_in_range(&smin, &smax);
        tracing::debug!(passing, "filter-passing count");
        if passing == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let plan =
            planner::plan_probabilistic(self.store.len(), passing, k, alpha, &self.sizing);
        let QueryPlan::AnnFilter { candidates } = plan else {
            unreachable!("probabilistic planning is always ANN-then-filter")
        };
        tracing::debug!(candidates, "chosen candidate budget");

        Ok(self.run_ann_filter(v, k, smin, smax, candidates, true))
    }

    fn check_query(&self, v: &[f32]) -> Result<()> {
        if self.store.is_empty() {
            return Err(IndexError::NoData);
        }
        if v.len() != self.store.dim() {
            return Err(IndexError::DimensionMismatch {
                expected: self.store.dim(),
                got: v.len(),
            });
        }
        Ok(())
    }

    /// Enumerate the scalar range through the tree and rank exactly.
    fn run_range_scan(&self, v: &[f32], k: usize, smin: f32, smax: f32) -> Vec<u32> {
        let ids = self.tree.range_query(&smin, &smax);
        let scored = ids
            .into_iter()
            .map(|id| (l2_distance_squared(v, self.store.vector(id)), id))
            .collect();
        planner::rank_candidates(scored, k)
    }

    /// Fetch `candidates` approximate neighbours, keep those in range, rank.
    fn run_ann_filter(
        &mut self,
        v: &[f32],
        k: usize,
        smin: f32,
        smax: f32,
        candidates: usize,
        raise_effort: bool,
    ) -> Vec<u32> {
        let Some(backend) = self.backend.as_mut() else {
            // Inserts always create the backend; an empty index was already
            // rejected by check_query.
            return Vec::new();
        };
        if raise_effort {
            backend.set_effort(self.default_effort.max(candidates + EFFORT_HEADROOM));
        }

        let hits = backend.top_o(v, candidates);
        let scored = hits
            .into_iter()
            .filter(|&(_, id)| {
                let s = self.store.scalar(id);
                s >= smin && s <= smax
            })
            .collect();
        planner::rank_candidates(scored, k)
    }
}
