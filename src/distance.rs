//! Dense-vector distance primitives.
//!
//! Candidate ranking everywhere in this crate uses **squared** Euclidean
//! distance: it orders identically to true L2 and skips the square root on
//! the hot path. [`l2_distance`] is provided for callers that need the
//! metric itself.

/// Squared L2 (Euclidean) distance.
///
/// If dimensions mismatch, this returns `f32::INFINITY` (so it is never
/// selected as a nearest neighbor).
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    l2_distance_squared(a, b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_distance_basic() {
        let a = [0.0_f32, 0.0];
        let b = [3.0_f32, 4.0];
        assert!((l2_distance_squared(&a, &b) - 25.0).abs() < 1e-6);
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = [1.5_f32, -2.0, 0.25];
        assert_eq!(l2_distance_squared(&a, &a), 0.0);
    }

    #[test]
    fn mismatched_dims_are_infinite() {
        let a = [1.0_f32, 2.0];
        let b = [1.0_f32, 2.0, 3.0];
        assert!(l2_distance_squared(&a, &b).is_infinite());
    }
}
