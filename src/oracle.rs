//! Range-median oracle ([`RangeMedian`]).
//!
//! Owns a weighted sample sequence `(y, w)` and memoizes
//! `(l, r) -> (mu, dist)` queries in a fixed-size, open-addressed cache
//! table. The cache is a pure memoization accelerator: dropping it (or
//! suffering a hash collision) never changes a query's answer, only its
//! cost. See `SPEC_FULL.md` §4.2 for the slot-indexing scheme.

use thiserror::Error;

use crate::median::weighted_median;

/// Errors produced by [`RangeMedian`] construction and queries.
#[derive(Debug, Error, PartialEq)]
pub enum OracleError {
    /// A query violated `0 <= l <= r < n`.
    #[error("query (l={l}, r={r}) out of range for n={n}")]
    OutOfRange {
        /// Left endpoint of the offending query.
        l: usize,
        /// Right endpoint of the offending query.
        r: usize,
        /// Length of the underlying sample sequence.
        n: usize,
    },
    /// The cache table could not be allocated.
    #[error("failed to allocate range-median cache")]
    AllocationFailure,
}

/// Result alias for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Clone, Copy)]
struct CacheEntry {
    l: usize,
    r: usize,
    mu: f64,
    dist: f64,
}

/// A memoized weighted-median/L¹-deviation provider over a fixed sample
/// sequence `(y, w)`.
///
/// Construction normalizes weights per the data model: a zero or
/// non-finite weight is replaced by the median of the positive weights,
/// or by `1.0` if no positive weight exists. The sequence is immutable
/// after construction.
pub struct RangeMedian {
    y: Vec<f64>,
    w: Vec<f64>,
    cache: Vec<Option<CacheEntry>>,
    capacity: usize,
}

impl RangeMedian {
    /// Builds an oracle over `y`/`w` of equal length.
    ///
    /// # Panics
    ///
    /// Panics if `y.len() != w.len()`. This is a caller-side programming
    /// error (mismatched arrays), not a data condition, so it is not
    /// modeled as an [`OracleError`].
    pub fn new(y: &[f64], w: &[f64]) -> Result<Self> {
        assert_eq!(y.len(), w.len(), "y and w must have equal length");

        let n = y.len();
        let w = normalize_weights(w);

        let capacity = 37 * n + 401;
        let mut cache = Vec::new();
        cache
            .try_reserve_exact(capacity)
            .map_err(|_| OracleError::AllocationFailure)?;
        cache.resize(capacity, None);

        Ok(Self {
            y: y.to_vec(),
            w,
            cache,
            capacity,
        })
    }

    /// Number of samples in the underlying sequence.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether the underlying sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// The (normalized) value/weight pair at `i`.
    pub fn sample(&self, i: usize) -> (f64, f64) {
        (self.y[i], self.w[i])
    }

    /// Borrowed view of the (normalized) value and weight sequences.
    pub fn samples(&self) -> (&[f64], &[f64]) {
        (&self.y, &self.w)
    }

    /// Median of the (already-positive, post-normalization) weights.
    pub fn median_weight(&self) -> f64 {
        median_positive_weight(&self.w)
    }

    /// Weighted median and L¹ deviation of `y[l..=r]` under `w[l..=r]`,
    /// memoized.
    pub fn get_mu_dist(&mut self, l: usize, r: usize) -> Result<(f64, f64)> {
        let n = self.y.len();
        if r >= n || l > r {
            return Err(OracleError::OutOfRange { l, r, n });
        }

        let slot = self.slot_index(l, r);
        if let Some(entry) = self.cache[slot] {
            if entry.l == l && entry.r == r {
                return Ok((entry.mu, entry.dist));
            }
        }

        let pairs: Vec<(f64, f64)> = (l..=r).map(|i| (self.y[i], self.w[i])).collect();
        let (mu, dist) = weighted_median(&pairs);
        self.cache[slot] = Some(CacheEntry { l, r, mu, dist });
        Ok((mu, dist))
    }

    fn slot_index(&self, l: usize, r: usize) -> usize {
        let f = r * (r + 1) / 2 + (r - l);
        f % self.capacity
    }
}

/// Median of the positive weights, or `1.0` if none are positive.
fn median_positive_weight(w: &[f64]) -> f64 {
    let mut positive: Vec<f64> = w.iter().copied().filter(|x| *x > 0.0).collect();
    if positive.is_empty() {
        return 1.0;
    }
    positive.sort_by(|a, b| a.partial_cmp(b).expect("finite weight"));
    let mid = positive.len() / 2;
    if positive.len() % 2 == 0 {
        (positive[mid - 1] + positive[mid]) / 2.0
    } else {
        positive[mid]
    }
}

fn normalize_weights(w: &[f64]) -> Vec<f64> {
    let replacement = median_positive_weight(w);
    w.iter()
        .map(|&x| if x > 0.0 && x.is_finite() { x } else { replacement })
        .collect()
}
