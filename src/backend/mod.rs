//! Pluggable approximate-nearest-neighbour backends.
//!
//! The hybrid index talks to its neighbour structure through the
//! [`AnnBackend`] capability only, so graph-based, partition-based and
//! exhaustive implementations are drop-in replacements for one another.
//! [`hnsw::HnswBackend`] is the default; [`BruteForceBackend`] trades speed
//! for exactness and is what deterministic tests pin the planner against.

pub mod hnsw;

use crate::distance::l2_distance_squared;

/// Capability contract for a neighbour backend.
///
/// Implementations must:
/// - accept caller-assigned dense ids in [`AnnBackend::add_point`];
/// - return candidates sorted by ascending distance from
///   [`AnnBackend::top_o`], at most `o` of them;
/// - report distances as squared L2.
pub trait AnnBackend {
    /// Register a vector under an external id.
    fn add_point(&mut self, vector: &[f32], id: u32);

    /// Up to `o` approximate nearest neighbours of `query`, ascending by
    /// distance.
    fn top_o(&mut self, query: &[f32], o: usize) -> Vec<(f32, u32)>;

    /// Set the internal search-effort parameter (beam width for graph
    /// backends). Backends without a tunable effort may ignore this.
    fn set_effort(&mut self, ef: usize);

    /// Number of registered points.
    fn len(&self) -> usize;

    /// True when no point is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive-scan backend: exact top-O at `O(n · d)` per query.
///
/// Useful below a few thousand points and as a reference oracle for the
/// approximate backends.
#[derive(Debug, Default)]
pub struct BruteForceBackend {
    vectors: Vec<f32>,
    ids: Vec<u32>,
    dim: usize,
}

impl BruteForceBackend {
    /// Create an empty backend for vectors of dimension `dim`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: Vec::new(),
            ids: Vec::new(),
            dim,
        }
    }

    fn vector(&self, slot: usize) -> &[f32] {
        let start = slot * self.dim;
        &self.vectors[start..start + self.dim]
    }
}

impl AnnBackend for BruteForceBackend {
    fn add_point(&mut self, vector: &[f32], id: u32) {
        debug_assert_eq!(vector.len(), self.dim);
        self.vectors.extend_from_slice(vector);
        self.ids.push(id);
    }

    fn top_o(&mut self, query: &[f32], o: usize) -> Vec<(f32, u32)> {
        let mut scored: Vec<(f32, u32)> = self
            .ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (l2_distance_squared(query, self.vector(slot)), id))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(o);
        scored
    }

    fn set_effort(&mut self, _ef: usize) {}

    fn len(&self) -> usize {
        self.ids.len()
    }
}
