//! Run summary.
//!
//! The text form is a contract with external tooling: the line starting
//! with `Solution score = ` is what score collectors grep for, and its
//! absence means the run scored 0.

use std::fmt;

use serde::Serialize;

use vmjudge_core::{BaselineScore, Counters};
use vmjudge_placement::{ScoreWeights, report_score};

/// Prefix of the score line in the text summary.
pub const SCORE_PREFIX: &str = "Solution score = ";

/// Outcome of one judging run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub counters: Counters,
    /// Every request up to the end tag was processed.
    pub finished: bool,
    /// Number of requests read from the problem.
    pub requests: u64,
    /// Scaled score; `None` without a baseline or after an abort.
    pub score: Option<f64>,
    /// Diagnostic of the fatal condition that ended the run, if any.
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new(
        counters: Counters,
        finished: bool,
        requests: u64,
        baseline: Option<&BaselineScore>,
        weights: &ScoreWeights,
    ) -> Self {
        Self {
            counters,
            finished,
            requests,
            score: baseline.map(|b| report_score(&counters, b, weights)),
            aborted: None,
        }
    }

    /// Mark the run as aborted; an aborted run is unfinished and unscored.
    pub fn abort(mut self, reason: impl fmt::Display) -> Self {
        self.finished = false;
        self.score = None;
        self.aborted = Some(reason.to_string());
        self
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Placed {} VMs. {} / {} VMs placed according to soft constraints.",
            self.counters.placed, self.counters.soft_fulfilled, self.counters.soft_total
        )?;
        writeln!(
            f,
            "{}ll requests processed.",
            if self.finished { "A" } else { "Not a" }
        )?;
        match (&self.aborted, self.score) {
            (Some(reason), _) => writeln!(f, "Run aborted: {reason}"),
            (None, Some(score)) => {
                writeln!(f, "{SCORE_PREFIX}{score:.3}")?;
                writeln!(f, "NOTE: Here test weight is 1.")
            }
            (None, None) => writeln!(f, "Can't compute solution score: no baseline score provided."),
        }
    }
}

/// Pull the score back out of a text summary; 0.0 when there is none.
pub fn extract_score(summary: &str) -> f64 {
    summary
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(SCORE_PREFIX))
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0.0)
}
