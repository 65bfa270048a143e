//! Probabilistic candidate sizing for the ANN-then-filter plan.
//!
//! The planner retrieves `O` approximate neighbours and keeps those whose
//! scalar passes the filter. Modelling the candidates as `O` independent
//! Bernoulli trials with success probability `p = S / M` (S filter-passing
//! records out of M total), this module finds the smallest `O` such that
//!
//! ```text
//! P[Binomial(O, p) < k] <= alpha
//! ```
//!
//! and pads it with a fixed safety margin. Independence is optimistic —
//! proximity to the query and membership in the scalar range are usually
//! correlated — so the margin absorbs the residual bias; `alpha` is a
//! target, not a guarantee. Numerical stability for extreme binomial
//! parameters is out of scope.

/// Tuning knobs for candidate sizing.
#[derive(Clone, Debug)]
pub struct SizingConfig {
    /// Fixed padding added to the solved candidate count.
    pub safety_margin: usize,
    /// Switch to the normal approximation once the crossover-region
    /// variance `k(1 - p)` exceeds this.
    pub normal_approx_variance: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            safety_margin: 100,
            normal_approx_variance: 25.0,
        }
    }
}

/// Binomial coefficient `C(n, k)` as a float.
///
/// Evaluated as a product of `(n - (k - i)) / i` terms, interleaving
/// multiplications and divisions so intermediates stay near the final
/// magnitude instead of overflowing factorials.
#[must_use]
pub fn binomial_coefficient(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    if k == 0 || k == n {
        return 1.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 1..=k {
        result = result * ((n - (k - i)) as f64) / i as f64;
    }
    result
}

/// Binomial PMF `P[X = k]` for `X ~ Binomial(n, p)`.
#[must_use]
pub fn binomial_pmf(n: u64, k: u64, p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return 0.0;
    }
    binomial_coefficient(n, k) * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32)
}

/// Lower tail `P[X < k]` for `X ~ Binomial(n, p)`.
#[must_use]
pub fn binomial_cdf_below(n: u64, k: u64, p: f64) -> f64 {
    (0..k).map(|i| binomial_pmf(n, i, p)).sum()
}

/// Inverse CDF of the standard normal distribution (Acklam's rational
/// approximation; absolute error below 1.15e-9 over the open unit
/// interval).
#[must_use]
#[allow(clippy::excessive_precision)]
pub fn inv_std_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return -1e10;
    }
    if p >= 1.0 {
        return 1e10;
    }

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        return (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
    }
    if p > P_HIGH {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        return -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
    }
    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}

/// Smallest `O` in `[k, m]` with `P[Binomial(O, s/m) < k] <= alpha`, by
/// binary search over the exact lower tail. No safety margin applied.
#[must_use]
pub fn required_candidates(m: usize, s: usize, k: usize, alpha: f64) -> usize {
    if k == 0 {
        return 0;
    }
    if s == 0 || s >= m || alpha <= 0.0 {
        return k;
    }

    let p = s as f64 / m as f64;
    let k64 = k as u64;
    let mut lo = k;
    let mut hi = m;
    let mut best = m;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        if binomial_cdf_below(mid as u64, k64, p) <= alpha {
            best = mid;
            hi = mid - 1;
        } else {
            lo = mid + 1;
        }
    }
    best
}

/// Normal-approximation variant of [`required_candidates`]: solves
/// `P[X < k] <= alpha` with `X ~ Normal(Op, Op(1-p))` and a continuity
/// correction. Appropriate once `O·p·(1-p)` is large (the tail sum gets
/// both slow and cancellation-prone there).
#[must_use]
pub fn required_candidates_normal(m: usize, s: usize, k: usize, alpha: f64) -> usize {
    if k == 0 {
        return 0;
    }
    if s == 0 || s >= m || alpha <= 0.0 {
        return k;
    }

    let p = s as f64 / m as f64;
    let z_alpha = inv_std_normal(alpha);
    let mut lo = k;
    let mut hi = m;
    let mut best = m;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let mean = mid as f64 * p;
        let stdev = (mid as f64 * p * (1.0 - p) + 1e-12).sqrt();
        if (k as f64 - 0.5 - mean) / stdev <= z_alpha {
            best = mid;
            hi = mid - 1;
        } else {
            lo = mid + 1;
        }
    }
    best
}

/// Candidate count for one query: the solved minimum plus the safety
/// margin, capped at nothing (callers clamp to the dataset if they care).
///
/// The edge cases are terminal and margin-free: `k = 0` asks for nothing,
/// and with `S = 0`, `S >= M` or `alpha <= 0` there is no sizing problem
/// to solve, so the answer is `k` itself. Only a genuine binary-search
/// solve gets padded. The solver is the exact binomial one in the
/// small-variance regime and the normal approximation past
/// `config.normal_approx_variance`, evaluated at the `O ≈ k/p` crossover
/// where the answer lives.
#[must_use]
pub fn choose_candidates(m: usize, s: usize, k: usize, alpha: f64, config: &SizingConfig) -> usize {
    if k == 0 {
        return 0;
    }
    if s == 0 || s >= m || alpha <= 0.0 {
        return k;
    }

    let p = s as f64 / m as f64;
    let solved = if k as f64 * (1.0 - p) > config.normal_approx_variance {
        required_candidates_normal(m, s, k, alpha)
    } else {
        required_candidates(m, s, k, alpha)
    };
    solved + config.safety_margin
}
