//! Plain configuration values threaded through the engine.
//!
//! Hyperparameters are constructed once by the caller and passed by
//! reference; nothing here is read from the environment or other process
//! state (`SPEC_FULL.md` §10.2).

/// Which direction of change constitutes a regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Lower values are better (e.g. execution time). A regression is an
    /// increase past `threshold`.
    LowerIsBetter,
    /// Higher values are better (e.g. throughput). A regression is a
    /// decrease past `threshold`.
    HigherIsBetter,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::LowerIsBetter
    }
}

/// Engine-wide configuration knobs (§6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Regression magnitude threshold, e.g. `0.05` for 5%.
    pub threshold: f64,
    /// Minimum segment length accepted by the fitter.
    pub min_size: usize,
    /// Maximum segment length accepted by the fitter. `None` resolves to
    /// `N` (the full sequence length) at call time.
    pub max_size: Option<usize>,
    /// Cap on the number of segments considered during the autogamma
    /// search. `None` resolves to `min(N, 20)` at call time.
    pub k_max: Option<usize>,
    /// BIC prefactor `β` in `r(N) = β * ln(N) / N`.
    pub beta: f64,
    /// Which direction of change is a regression.
    pub direction: Direction,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            min_size: 1,
            max_size: None,
            k_max: None,
            beta: 0.3,
            direction: Direction::LowerIsBetter,
        }
    }
}

impl Config {
    /// Resolves `max_size` against a concrete sequence length `n`.
    pub fn resolved_max_size(&self, n: usize) -> usize {
        self.max_size.unwrap_or(n).max(self.min_size).min(n.max(1))
    }

    /// Resolves `k_max` against a concrete sequence length `n`.
    pub fn resolved_k_max(&self, n: usize) -> usize {
        self.k_max.unwrap_or_else(|| n.min(20)).max(1)
    }
}
