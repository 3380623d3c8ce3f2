//! vmjudge-session — the interactive judging loop.
//!
//! Drives one contestant through a problem file and validates every
//! answer against the cluster model in `vmjudge-core` and the group rules
//! in `vmjudge-placement`:
//!
//! - Reads the problem and forwards it to the contestant
//! - Validates placements (ranges, NUMA shape, capacity, affinity)
//! - Applies releases
//! - Shuts the contestant down and reports counters and score
//!
//! # Architecture
//!
//! ```text
//! run_judge
//!   ├── ProblemReader (problem file, line-numbered errors)
//!   ├── ContestantProcess ──► ContestantLink (flushed writes, timed reads)
//!   └── Session (state machine)
//!       ├── ResourcePool
//!       ├── PlacementGroup table
//!       └── VM table
//! ```

pub mod error;
pub mod judge;
pub mod link;
pub mod problem;
pub mod process;
pub mod report;
pub mod session;

pub use error::{JudgeFailure, SessionError, SessionResult};
pub use judge::{JudgeOptions, run_judge};
pub use link::ContestantLink;
pub use problem::{ProblemReader, parse_baseline, read_baseline};
pub use process::ContestantProcess;
pub use report::{RunReport, SCORE_PREFIX, extract_score};
pub use session::{Ending, Session, SessionState};
