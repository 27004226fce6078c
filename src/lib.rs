//! Regression / step-detection engine for longitudinal benchmark series.
//!
//! This crate reconstructs a piecewise-constant signal from a noisy
//! weighted sequence of benchmark measurements indexed by revision,
//! identifies the step changes, and reports which of them constitute
//! performance regressions. It is a pure-data library: no I/O, no
//! logging, no process-global state.
//!
//! ## Pipeline
//!
//! 1. [`oracle::RangeMedian`] — memoized weighted-median/L¹-deviation
//!    oracle over the (filtered, weight-normalized) sample sequence.
//! 2. [`potts::solve_potts`] — optimal piecewise-constant L¹ fit for a
//!    given penalty `gamma`.
//! 3. [`autogamma::solve_potts_autogamma`] — brackets `gamma` to minimize
//!    a BIC-style score and returns the winning segmentation.
//! 4. [`classifier::detect_regressions`] — walks the winning segmentation
//!    and classifies which transitions are regressions.
//!
//! [`analyze`] runs the full pipeline from raw `(value, weight)` pairs to
//! a regression list in one call.
//!
//! ## Invariants
//!
//! - The engine never mutates shared state and performs no I/O; every
//!   function here is a pure transformation of its arguments.
//! - Determinism is mandatory: identical inputs produce bitwise-identical
//!   outputs, on any platform. Floating-point sums are accumulated in a
//!   fixed left-to-right order for this reason (never reordered for
//!   SIMD); see `potts::solve_potts`'s non-strict tie-break rule, which
//!   is sensitive to rounding.
//! - Degenerate but valid inputs (`N = 0`, `N = 1`, all-equal values,
//!   all-zero weights) produce a trivial one-segment (or zero-segment,
//!   for `N = 0`) result, never an error.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use thiserror::Error;

/// Weighted-median primitive ([`median::weighted_median`]).
pub mod median;
/// Memoized range-median oracle ([`oracle::RangeMedian`]).
pub mod oracle;
/// Piecewise-constant L¹ fitter ([`potts::solve_potts`]).
pub mod potts;
/// AR(1) residual estimator ([`ar1::fit_ar1`]).
pub mod ar1;
/// BIC-driven autogamma driver ([`autogamma::solve_potts_autogamma`]).
pub mod autogamma;
/// Regression classifier ([`classifier::detect_regressions`]).
pub mod classifier;
/// Plain configuration values ([`config::Config`]).
pub mod config;

pub use autogamma::{solve_potts_autogamma, AutogammaFit};
pub use classifier::{detect_regressions, Regression};
pub use config::{Config, Direction};
pub use oracle::RangeMedian;
pub use potts::{solve_potts, Segmentation};

/// Errors surfaced by the end-to-end [`analyze`] pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Oracle construction or a query into it failed.
    #[error(transparent)]
    Oracle(#[from] oracle::OracleError),
    /// The autogamma driver failed (only possible on misconfiguration).
    #[error(transparent)]
    Autogamma(#[from] autogamma::AutogammaError),
}

/// The full result of running the pipeline on one benchmark series.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// The BIC-selected piecewise-constant fit.
    pub segmentation: Segmentation,
    /// The `gamma` that produced the winning fit.
    pub gamma: f64,
    /// The fitted AR(1) coefficient at the winning fit.
    pub rho: f64,
    /// The classified regressions, oldest first.
    pub regressions: Vec<Regression>,
}

/// Runs the full pipeline: builds an oracle over `(y, w)`, brackets
/// `gamma` to find the best piecewise-constant fit, and classifies its
/// transitions into regressions.
///
/// `y` and `w` must already be filtered to finite values by the caller
/// (§6 of `SPEC_FULL.md`: the filter stage — dropping `null`/`NaN`/
/// non-positive-variance entries — is an external collaborator, not the
/// engine's concern). Zero or non-finite weights are still normalized
/// internally per the data model (§3).
pub fn analyze(y: &[f64], w: &[f64], config: &Config) -> Result<AnalysisResult, EngineError> {
    let mut oracle = RangeMedian::new(y, w)?;
    let fit = solve_potts_autogamma(&mut oracle, config)?;
    let regressions = detect_regressions(&fit.segmentation, config);

    Ok(AnalysisResult {
        segmentation: fit.segmentation,
        gamma: fit.gamma,
        rho: fit.rho,
        regressions,
    })
}
