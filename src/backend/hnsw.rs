//! Incremental hierarchical small-world graph backend.
//!
//! A multi-layer proximity graph in the HNSW family (Malkov & Yashunin,
//! 2016): sparse upper layers provide long-range entry routing, the dense
//! base layer provides precise search. Unlike offline builders, points are
//! wired into the graph **at insert time** — the hybrid index interleaves
//! inserts and queries and never gets a separate build phase.
//!
//! Reference parameters: connectivity `m = 16` (base layer degree cap
//! `2m`), construction beam `ef_construction = 200`, default search beam
//! `ef_search = 200`. The search beam is raised per-query through
//! [`AnnBackend::set_effort`].

use std::collections::{BinaryHeap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use super::AnnBackend;
use crate::distance::l2_distance_squared;

/// Per-node, per-layer adjacency list. Inline capacity covers the upper
/// layers (degree cap `m = 16`); base-layer lists spill to the heap.
type Neighbors = SmallVec<[u32; 16]>;

/// Hard cap on sampled levels; with `mL = 1/ln(16)` the probability of
/// reaching it is negligible for any realistic dataset.
const MAX_LEVEL: usize = 32;

/// Construction and search parameters.
#[derive(Clone, Debug)]
pub struct HnswParams {
    /// Graph connectivity: degree cap on upper layers, `2m` on the base
    /// layer, and the number of neighbours wired per inserted point.
    pub m: usize,
    /// Beam width while wiring a new point.
    pub ef_construction: usize,
    /// Default beam width for queries (raised per-query via `set_effort`).
    pub ef_search: usize,
    /// Expected point count; used to pre-reserve storage.
    pub capacity: usize,
    /// Seed for the level sampler; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 200,
            capacity: 100_000,
            seed: None,
        }
    }
}

/// Search candidate ordered for a min-heap (closest first).
#[derive(PartialEq)]
struct MinCandidate {
    slot: u32,
    distance: f32,
}

impl Eq for MinCandidate {}

impl Ord for MinCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap, we pop the closest.
        other.distance.total_cmp(&self.distance)
    }
}

impl PartialOrd for MinCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Beam entry ordered for a max-heap (worst kept on top for eviction).
#[derive(PartialEq)]
struct MaxResult {
    slot: u32,
    distance: f32,
}

impl Eq for MaxResult {}

impl Ord for MaxResult {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

impl PartialOrd for MaxResult {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Incremental small-world graph over squared-L2 distance.
pub struct HnswBackend {
    dim: usize,
    params: HnswParams,
    /// Slot-major flat vector storage (stride `dim`).
    vectors: Vec<f32>,
    /// External id per slot; slots are assigned in insertion order.
    ids: Vec<u32>,
    /// Adjacency per slot, one list per layer `0..=top_level(slot)`.
    links: Vec<Vec<Neighbors>>,
    /// Entry point slot and its top layer.
    entry: Option<u32>,
    entry_level: usize,
    /// Current search beam width.
    ef_search: usize,
    /// Level sampling factor `1 / ln(m)`.
    ml: f64,
    rng: StdRng,
}

impl HnswBackend {
    /// Create an empty graph for vectors of dimension `dim`.
    #[must_use]
    pub fn new(dim: usize, params: HnswParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let ml = 1.0 / (params.m.max(2) as f64).ln();
        Self {
            dim,
            vectors: Vec::with_capacity(dim * params.capacity),
            ids: Vec::with_capacity(params.capacity),
            links: Vec::with_capacity(params.capacity),
            entry: None,
            entry_level: 0,
            ef_search: params.ef_search,
            ml,
            rng,
            params,
        }
    }

    #[inline]
    fn slot_vector(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Geometric level sampling: `floor(-ln(U) * mL)`.
    fn sample_level(&mut self) -> usize {
        let u: f64 = self.rng.random::<f64>().max(f64::MIN_POSITIVE);
        ((-u.ln() * self.ml).floor() as usize).min(MAX_LEVEL)
    }

    /// Beam search within one layer, starting from `entry`.
    ///
    /// Returns up to `ef` candidates sorted by ascending distance. The beam
    /// stops once the closest unexplored candidate cannot improve the worst
    /// kept result.
    fn search_layer(&self, query: &[f32], entry: u32, level: usize, ef: usize) -> Vec<(f32, u32)> {
        let mut candidates: BinaryHeap<MinCandidate> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<MaxResult> = BinaryHeap::with_capacity(ef + 1);
        let mut visited: HashSet<u32> = HashSet::with_capacity(ef * 2);

        let entry_distance = l2_distance_squared(query, self.slot_vector(entry));
        candidates.push(MinCandidate {
            slot: entry,
            distance: entry_distance,
        });
        results.push(MaxResult {
            slot: entry,
            distance: entry_distance,
        });
        visited.insert(entry);

        while let Some(candidate) = candidates.pop() {
            let worst = results.peek().map_or(f32::INFINITY, |r| r.distance);
            if candidate.distance > worst && results.len() >= ef {
                break;
            }

            for &neighbor in &self.links[candidate.slot as usize][level] {
                if visited.insert(neighbor) {
                    let distance = l2_distance_squared(query, self.slot_vector(neighbor));
                    let worst = results.peek().map_or(f32::INFINITY, |r| r.distance);
                    if results.len() < ef || distance < worst {
                        candidates.push(MinCandidate {
                            slot: neighbor,
                            distance,
                        });
                        results.push(MaxResult {
                            slot: neighbor,
                            distance,
                        });
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut output: Vec<(f32, u32)> =
            results.into_iter().map(|r| (r.distance, r.slot)).collect();
        output.sort_by(|a, b| a.0.total_cmp(&b.0));
        output
    }

    /// Relative-neighbourhood selection: keep a candidate only if it is
    /// closer to the query than to every already-kept neighbour, then top
    /// up with the closest remainder. Keeps edges diverse instead of
    /// bunching them on one side of the query.
    fn select_neighbors(&self, query: &[f32], candidates: &[(f32, u32)], m: usize) -> Vec<u32> {
        let mut selected: Vec<u32> = Vec::with_capacity(m.min(candidates.len()));

        for &(query_distance, slot) in candidates {
            if selected.len() >= m {
                break;
            }
            let vector = self.slot_vector(slot);
            let diverse = selected.iter().all(|&kept| {
                query_distance < l2_distance_squared(vector, self.slot_vector(kept))
            });
            if diverse {
                selected.push(slot);
            }
        }

        for &(_, slot) in candidates {
            if selected.len() >= m {
                break;
            }
            if !selected.contains(&slot) {
                selected.push(slot);
            }
        }

        selected
    }

    /// Re-rank a slot's neighbour list by distance and truncate to the
    /// layer's degree cap.
    fn prune_neighbors(&mut self, slot: u32, level: usize, max_degree: usize) {
        let mut scored: Vec<(f32, u32)> = {
            let base = self.slot_vector(slot);
            self.links[slot as usize][level]
                .iter()
                .map(|&n| (l2_distance_squared(base, self.slot_vector(n)), n))
                .collect()
        };
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(max_degree);
        self.links[slot as usize][level] = scored.into_iter().map(|(_, n)| n).collect();
    }
}

impl AnnBackend for HnswBackend {
    fn add_point(&mut self, vector: &[f32], id: u32) {
        debug_assert_eq!(vector.len(), self.dim, "vector dimension mismatch");

        let slot = self.ids.len() as u32;
        self.vectors.extend_from_slice(vector);
        self.ids.push(id);

        let level = self.sample_level();
        self.links
            .push((0..=level).map(|_| Neighbors::new()).collect());

        let Some(mut ep) = self.entry else {
            self.entry = Some(slot);
            self.entry_level = level;
            return;
        };

        // Route down through layers above the new point's level with a
        // beam of 1, refining the entry point.
        for layer in ((level + 1)..=self.entry_level).rev() {
            if let Some(&(_, best)) = self.search_layer(vector, ep, layer, 1).first() {
                ep = best;
            }
        }

        // Wire the point into every layer it participates in.
        for layer in (0..=level.min(self.entry_level)).rev() {
            let candidates = self.search_layer(vector, ep, layer, self.params.ef_construction);
            if let Some(&(_, best)) = candidates.first() {
                ep = best;
            }

            let max_degree = if layer == 0 {
                self.params.m * 2
            } else {
                self.params.m
            };
            let selected = self.select_neighbors(vector, &candidates, self.params.m);

            for &neighbor in &selected {
                self.links[slot as usize][layer].push(neighbor);
                self.links[neighbor as usize][layer].push(slot);
                if self.links[neighbor as usize][layer].len() > max_degree {
                    self.prune_neighbors(neighbor, layer, max_degree);
                }
            }
        }

        if level > self.entry_level {
            self.entry = Some(slot);
            self.entry_level = level;
        }
    }

    fn top_o(&mut self, query: &[f32], o: usize) -> Vec<(f32, u32)> {
        let Some(mut ep) = self.entry else {
            return Vec::new();
        };
        if o == 0 {
            return Vec::new();
        }

        for layer in (1..=self.entry_level).rev() {
            if let Some(&(_, best)) = self.search_layer(query, ep, layer, 1).first() {
                ep = best;
            }
        }

        let ef = self.ef_search.max(o);
        let mut results = self.search_layer(query, ep, 0, ef);
        results.truncate(o);
        results
            .into_iter()
            .map(|(distance, slot)| (distance, self.ids[slot as usize]))
            .collect()
    }

    fn set_effort(&mut self, ef: usize) {
        self.ef_search = ef;
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
