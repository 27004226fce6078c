//! Regression classifier ([`detect_regressions`]).
//!
//! Walks a segmentation left to right, tracking the best level seen so
//! far, and emits a record wherever a segment transition crosses the
//! configured regression threshold in the configured direction. See
//! `SPEC_FULL.md` §4.6.

use crate::config::{Config, Direction};
use crate::potts::Segmentation;

/// A single detected regression: the last index of the pre-step segment
/// and the first index of the post-step segment, with both levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    /// Last absolute index of the segment before the step.
    pub index_before: usize,
    /// First absolute index of the segment after the step.
    pub index_after: usize,
    /// Level of the segment before the step.
    pub level_before: f64,
    /// Level of the segment after the step.
    pub level_after: f64,
}

/// Walks `seg` and returns every transition that constitutes a
/// regression under `config`, oldest first.
///
/// A single-segment input never yields a regression.
pub fn detect_regressions(seg: &Segmentation, config: &Config) -> Vec<Regression> {
    if seg.k() < 2 {
        return Vec::new();
    }

    let worse = |candidate: f64, best: f64| -> bool {
        match config.direction {
            Direction::LowerIsBetter => candidate > best * (1.0 + config.threshold),
            Direction::HigherIsBetter => candidate < best * (1.0 - config.threshold),
        }
    };

    let mut regressions = Vec::new();
    let mut best_so_far = seg.levels[0];

    for r in 1..seg.k() {
        let level_before = seg.levels[r - 1];
        let level_after = seg.levels[r];

        if worse(level_after, best_so_far) {
            let (_, boundary) = seg.segment(r - 1);
            regressions.push(Regression {
                index_before: boundary - 1,
                index_after: boundary,
                level_before,
                level_after,
            });
        }

        best_so_far = match config.direction {
            Direction::LowerIsBetter => best_so_far.min(level_after),
            Direction::HigherIsBetter => best_so_far.max(level_after),
        };
    }

    regressions
}
