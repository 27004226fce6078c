//! Piecewise-constant L¹ fitter ([`solve_potts`]).
//!
//! A dynamic program over right endpoints: `best[t]` is the optimal cost
//! of covering `[min_pos, min_pos + t)` with segments whose lengths lie in
//! `[min_size, max_size]`, where each extra segment costs `gamma`. See
//! `SPEC_FULL.md` §4.3 for the recurrence and the tie-break rule this
//! implementation must preserve (non-strict `<=`, so the *latest*
//! considered `left` wins a tie).

use thiserror::Error;

use crate::oracle::{OracleError, RangeMedian};

/// Errors produced by [`solve_potts`].
#[derive(Debug, Error, PartialEq)]
pub enum PottsError {
    /// The fitter's own inputs (size/position bounds) are invalid.
    #[error("invalid potts bounds: {0}")]
    InvalidBounds(&'static str),
    /// A query the fitter issued to the oracle was rejected.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Result alias for fitter operations.
pub type Result<T> = std::result::Result<T, PottsError>;

/// A piecewise-constant fit: `k` contiguous segments tiling
/// `[min_pos, max_pos)`, each with a level `mu`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Absolute segment boundaries, length `k + 1`: `boundaries[0] ==
    /// min_pos`, `boundaries[k] == max_pos`, strictly increasing.
    pub boundaries: Vec<usize>,
    /// Per-segment level (weighted median), length `k`.
    pub levels: Vec<f64>,
}

impl Segmentation {
    /// Number of segments `k`.
    pub fn k(&self) -> usize {
        self.levels.len()
    }

    /// The half-open interval covered by segment `r` (0-indexed).
    pub fn segment(&self, r: usize) -> (usize, usize) {
        (self.boundaries[r], self.boundaries[r + 1])
    }

    /// The exclusive right edge of each segment, `[boundaries[1..]]` —
    /// the `right_edges[]` output named in the fitter's contract.
    pub fn right_edges(&self) -> &[usize] {
        &self.boundaries[1..]
    }
}

/// Fits an optimal piecewise-constant partition of `[min_pos, max_pos)`
/// minimizing `sum(dist(segment)) + gamma * (k - 1)`, subject to every
/// segment length lying in `[min_size, max_size]`.
pub fn solve_potts(
    oracle: &mut RangeMedian,
    gamma: f64,
    min_size: usize,
    max_size: usize,
    min_pos: usize,
    max_pos: usize,
) -> Result<Segmentation> {
    let n = oracle.len();
    if min_size == 0 || min_size > max_size {
        return Err(PottsError::InvalidBounds(
            "require 0 < min_size <= max_size",
        ));
    }
    if min_pos > max_pos || max_pos > n {
        return Err(PottsError::InvalidBounds(
            "require 0 <= min_pos <= max_pos <= n",
        ));
    }

    let m = max_pos - min_pos;
    if m == 0 {
        return Ok(Segmentation {
            boundaries: vec![min_pos],
            levels: Vec::new(),
        });
    }

    let mut best = vec![f64::INFINITY; m + 1];
    best[0] = -gamma;
    let mut pred: Vec<i64> = vec![0; m];
    let mut level_for_t: Vec<f64> = vec![0.0; m];

    for t in 1..=m {
        let r = min_pos + t - 1;
        let lo = (r as i64 + 1 - max_size as i64).max(min_pos as i64);
        let hi_excl = (r as i64 - min_size as i64 + 2).max(min_pos as i64);

        let mut left = lo;
        while left < hi_excl {
            let left_u = left as usize;
            let prev_t = left_u - min_pos;
            let (mu, d) = oracle.get_mu_dist(left_u, r)?;
            let b = best[prev_t] + gamma + d;
            if b <= best[t] {
                best[t] = b;
                pred[t - 1] = left - 1;
                level_for_t[t - 1] = mu;
            }
            left += 1;
        }
    }

    if !best[m].is_finite() {
        return Err(PottsError::InvalidBounds(
            "no feasible partition covers [min_pos, max_pos) under the given size bounds",
        ));
    }

    let mut boundaries_rev = vec![max_pos];
    let mut levels_rev = Vec::new();
    let mut cur_t = m;
    while cur_t > 0 {
        let left = (pred[cur_t - 1] + 1) as usize;
        levels_rev.push(level_for_t[cur_t - 1]);
        boundaries_rev.push(left);
        cur_t = left - min_pos;
    }

    boundaries_rev.reverse();
    levels_rev.reverse();

    Ok(Segmentation {
        boundaries: boundaries_rev,
        levels: levels_rev,
    })
}

/// Total L¹ residual `sum(dist(segment))` of a segmentation, recomputed
/// from the oracle (memoized, so this is cheap after [`solve_potts`]).
pub fn total_dist(oracle: &mut RangeMedian, seg: &Segmentation) -> Result<f64> {
    let mut total = 0.0;
    for r in 0..seg.k() {
        let (l, r_excl) = seg.segment(r);
        let (_, d) = oracle.get_mu_dist(l, r_excl - 1)?;
        total += d;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_of(y: &[f64]) -> RangeMedian {
        let w = vec![1.0; y.len()];
        RangeMedian::new(y, &w).unwrap()
    }

    #[test]
    fn rejects_invalid_size_bounds() {
        let mut oracle = oracle_of(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            solve_potts(&mut oracle, 1.0, 0, 3, 0, 3),
            Err(PottsError::InvalidBounds(_))
        ));
        assert!(matches!(
            solve_potts(&mut oracle, 1.0, 3, 2, 0, 3),
            Err(PottsError::InvalidBounds(_))
        ));
    }

    #[test]
    fn rejects_invalid_position_bounds() {
        let mut oracle = oracle_of(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            solve_potts(&mut oracle, 1.0, 1, 3, 2, 1),
            Err(PottsError::InvalidBounds(_))
        ));
        assert!(matches!(
            solve_potts(&mut oracle, 1.0, 1, 3, 0, 4),
            Err(PottsError::InvalidBounds(_))
        ));
    }

    #[test]
    fn empty_range_has_zero_segments() {
        let mut oracle = oracle_of(&[1.0, 2.0, 3.0]);
        let seg = solve_potts(&mut oracle, 1.0, 1, 3, 2, 2).unwrap();
        assert_eq!(seg.k(), 0);
        assert_eq!(seg.boundaries, vec![2]);
    }

    #[test]
    fn large_gamma_yields_one_segment() {
        let mut oracle = oracle_of(&[1.0, 1.0, 1.0, 5.0, 5.0, 5.0]);
        let seg = solve_potts(&mut oracle, 1000.0, 1, 6, 0, 6).unwrap();
        assert_eq!(seg.k(), 1);
        assert_eq!(seg.boundaries, vec![0, 6]);
    }

    #[test]
    fn zero_gamma_on_a_clean_step_finds_the_step() {
        let mut oracle = oracle_of(&[1.0, 1.0, 1.0, 5.0, 5.0, 5.0]);
        let seg = solve_potts(&mut oracle, 0.0, 1, 6, 0, 6).unwrap();
        assert_eq!(seg.boundaries, vec![0, 3, 6]);
        assert_eq!(seg.levels, vec![1.0, 5.0]);
    }

    #[test]
    fn segments_tile_the_range_exactly_within_size_bounds() {
        let y: Vec<f64> = (0..20).map(|i| (i as f64 % 3.0) * 2.0).collect();
        let mut oracle = oracle_of(&y);
        let seg = solve_potts(&mut oracle, 0.5, 2, 5, 0, 20).unwrap();
        assert_eq!(seg.boundaries.first().copied(), Some(0));
        assert_eq!(seg.boundaries.last().copied(), Some(20));
        for w in seg.boundaries.windows(2) {
            let len = w[1] - w[0];
            assert!(len >= 2 && len <= 5, "segment length {len} out of bounds");
        }
    }

    #[test]
    fn infeasible_bounds_report_invalid_bounds() {
        let mut oracle = oracle_of(&[1.0, 2.0]);
        // min_size=3 but the range [0,2) only has 2 elements: no feasible partition.
        assert!(matches!(
            solve_potts(&mut oracle, 1.0, 3, 5, 0, 2),
            Err(PottsError::InvalidBounds(_))
        ));
    }

    #[test]
    fn larger_gamma_never_increases_segment_count() {
        let y = [1.0, 1.2, 0.9, 5.0, 5.1, 4.9, 1.0, 1.1, 0.95];
        let mut oracle = oracle_of(&y);
        let mut prev_k = usize::MAX;
        for gamma_milli in 0..=2000u32 {
            let gamma = gamma_milli as f64 / 100.0;
            let seg = solve_potts(&mut oracle, gamma, 1, y.len(), 0, y.len()).unwrap();
            assert!(seg.k() <= prev_k, "k grew as gamma increased");
            prev_k = seg.k();
        }
    }
}
