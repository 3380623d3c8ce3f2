//! Run scoring.
//!
//! A run is scored relative to a baseline as a weighted sum of:
//! - **Placement ratio**: VMs placed vs. baseline placements
//! - **Soft ratio**: VMs honouring soft rules vs. baseline soft count
//!
//! Ratios are not capped, so beating the baseline scores above 1.0.

use vmjudge_core::{BaselineScore, Counters};

/// Scale applied to the raw score before it is reported.
pub const REPORT_SCALE: f64 = 1000.0;

/// Weights for the scoring components.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreWeights {
    pub placed: f64,
    pub soft: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            placed: 0.8,
            soft: 0.2,
        }
    }
}

/// Raw weighted score of a run against a baseline.
pub fn score(counters: &Counters, baseline: &BaselineScore, weights: &ScoreWeights) -> f64 {
    let placed = counters.placed as f64 / baseline.placed.max(1) as f64;
    let soft = counters.soft_fulfilled as f64 / baseline.soft_fulfilled.max(1) as f64;
    weights.placed * placed + weights.soft * soft
}

/// Score as reported in the run summary (scaled by [`REPORT_SCALE`]).
pub fn report_score(counters: &Counters, baseline: &BaselineScore, weights: &ScoreWeights) -> f64 {
    score(counters, baseline, weights) * REPORT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(placed: u64, soft_fulfilled: u64) -> Counters {
        Counters {
            placed,
            soft_fulfilled,
            soft_total: soft_fulfilled,
        }
    }

    #[test]
    fn matching_baseline_scores_one() {
        let baseline = BaselineScore { placed: 10, soft_fulfilled: 4 };
        let s = score(&counters(10, 4), &baseline, &ScoreWeights::default());
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_baseline_divides_by_one() {
        let baseline = BaselineScore { placed: 0, soft_fulfilled: 0 };
        let s = score(&counters(1, 0), &baseline, &ScoreWeights::default());
        assert!((s - 0.8).abs() < 1e-12);
    }

    #[test]
    fn ratios_are_not_capped() {
        let baseline = BaselineScore { placed: 2, soft_fulfilled: 1 };
        let s = report_score(&counters(4, 3), &baseline, &ScoreWeights::default());
        // 0.8 * 2 + 0.2 * 3 = 2.2
        assert!((s - 2200.0).abs() < 1e-9);
    }

    #[test]
    fn custom_weights() {
        let baseline = BaselineScore { placed: 1, soft_fulfilled: 1 };
        let weights = ScoreWeights { placed: 0.0, soft: 1.0 };
        let s = score(&counters(5, 0), &baseline, &weights);
        assert_eq!(s, 0.0);
    }
}
