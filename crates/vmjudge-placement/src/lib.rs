//! vmjudge placement rules — group constraints and scoring.
//!
//! This crate decides whether a placement is allowed by its group and
//! what a finished run is worth. It does NOT touch CPU/memory accounting
//! (that's `vmjudge-core::pool`) or the wire protocol (`vmjudge-session`).
//!
//! # Components
//!
//! - **`group`** — Placement-group tracker (anti-affinity, affinity, soft tallies)
//! - **`scorer`** — Baseline-relative run score

pub mod group;
pub mod scorer;

pub use group::{ConflictingRackRules, PlacementGroup, SoftTally};
pub use scorer::{REPORT_SCALE, ScoreWeights, report_score, score};
