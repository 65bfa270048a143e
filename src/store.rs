//! Append-only record storage.
//!
//! Vectors live in a single flat buffer with stride `dim` (structure of
//! arrays), scalars in a parallel column. Record ids are dense: the id of a
//! record equals the store's length at the moment it was inserted, and ids
//! are never reused.

use crate::error::{IndexError, Result};

/// Append-only store of (vector, scalar) records.
///
/// The dimension is pinned by the first insert; every later insert must
/// match it.
#[derive(Debug, Default)]
pub struct RecordStore {
    vectors: Vec<f32>,
    scalars: Vec<f32>,
    dim: usize,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its id.
    ///
    /// Fails with [`IndexError::EmptyVector`] on a zero-length vector and
    /// [`IndexError::DimensionMismatch`] once the dimension is pinned.
    pub fn insert(&mut self, vector: &[f32], scalar: f32) -> Result<u32> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        if self.scalars.is_empty() {
            self.dim = vector.len();
        } else if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }

        let id = self.scalars.len() as u32;
        self.vectors.extend_from_slice(vector);
        self.scalars.push(scalar);
        Ok(id)
    }

    /// Vector of record `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never returned by [`RecordStore::insert`].
    #[inline]
    #[must_use]
    pub fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Scalar of record `id`.
    #[inline]
    #[must_use]
    pub fn scalar(&self, id: u32) -> f32 {
        self.scalars[id as usize]
    }

    /// Number of stored records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scalars.len()
    }

    /// True when no record has been inserted.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }

    /// Vector dimension, or 0 before the first insert.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_in_insert_order() {
        let mut store = RecordStore::new();
        for i in 0..10 {
            let id = store.insert(&[i as f32, 0.0], i as f32).unwrap();
            assert_eq!(id, i);
        }
        assert_eq!(store.len(), 10);
        assert_eq!(store.vector(3), &[3.0, 0.0]);
        assert_eq!(store.scalar(7), 7.0);
    }

    #[test]
    fn empty_vector_is_rejected() {
        let mut store = RecordStore::new();
        assert_eq!(store.insert(&[], 1.0), Err(IndexError::EmptyVector));
        assert!(store.is_empty());
    }

    #[test]
    fn first_insert_pins_dimension() {
        let mut store = RecordStore::new();
        store.insert(&[1.0, 2.0, 3.0], 0.5).unwrap();
        assert_eq!(store.dim(), 3);
        assert_eq!(
            store.insert(&[1.0, 2.0], 0.5),
            Err(IndexError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        );
        // A failed insert must not burn an id.
        assert_eq!(store.len(), 1);
    }
}
