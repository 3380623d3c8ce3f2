//! Judge runner — one problem file, one contestant, one report.
//!
//! ```text
//! problem file ──► Session ◄──► ContestantLink ◄──► contestant process
//!                     │
//!                     └──► counters ──► RunReport (+ baseline score)
//! ```
//!
//! Whatever ends the session, the contestant is told to stop (best
//! effort), its stdin is closed, and the process is reaped before the
//! report is built.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::BufReader;
use tracing::{error, info};

use vmjudge_core::config::{DEFAULT_RESPONSE_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT};
use vmjudge_core::{BaselineScore, JudgeConfig};
use vmjudge_placement::ScoreWeights;

use crate::error::{JudgeFailure, SessionError};
use crate::problem::{ProblemReader, read_baseline};
use crate::process::ContestantProcess;
use crate::report::RunReport;
use crate::session::{Ending, Session};

/// Everything needed to judge one run.
#[derive(Debug, Clone)]
pub struct JudgeOptions {
    pub problem: PathBuf,
    pub baseline: Option<PathBuf>,
    /// Contestant program followed by its arguments.
    pub command: Vec<String>,
    pub response_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub weights: ScoreWeights,
}

impl JudgeOptions {
    pub fn new(problem: impl Into<PathBuf>, command: Vec<String>) -> Self {
        Self {
            problem: problem.into(),
            baseline: None,
            command,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            weights: ScoreWeights::default(),
        }
    }

    /// Apply timeouts and score weights from a config file.
    pub fn with_config(mut self, config: &JudgeConfig) -> anyhow::Result<Self> {
        self.response_timeout = config.response_timeout()?;
        self.shutdown_timeout = config.shutdown_timeout()?;
        let (placed, soft) = config.score_weights();
        self.weights = ScoreWeights { placed, soft };
        Ok(self)
    }

    pub fn with_baseline(mut self, baseline: impl Into<PathBuf>) -> Self {
        self.baseline = Some(baseline.into());
        self
    }
}

/// Judge one run end to end.
pub async fn run_judge(options: &JudgeOptions) -> Result<RunReport, JudgeFailure> {
    let baseline: Option<BaselineScore> = match &options.baseline {
        Some(path) => Some(read_baseline(path).await.map_err(JudgeFailure::before_start)?),
        None => {
            info!("no baseline given; score will not be computed");
            None
        }
    };

    let file = tokio::fs::File::open(&options.problem)
        .await
        .map_err(JudgeFailure::before_start)?;
    let mut problem = ProblemReader::new(BufReader::new(file));

    let (process, mut link) = ContestantProcess::spawn(&options.command, options.response_timeout)
        .map_err(JudgeFailure::before_start)?;

    let mut session = Session::new();
    let result = session.run(&mut problem, &mut link).await;

    if !matches!(result, Ok(Ending::Completed)) {
        link.send_end().await;
    }
    drop(link);
    let exit = process.finish(options.shutdown_timeout).await;

    let report = RunReport::new(
        session.counters(),
        matches!(result, Ok(Ending::Completed)),
        session.request_id(),
        baseline.as_ref(),
        &options.weights,
    );

    let error = match (result, exit) {
        (Err(error), _) => error,
        (Ok(_), Err(kind)) => SessionError::Violation(kind.at(session.request_id())),
        (Ok(_), Ok(())) => {
            info!(
                placed = report.counters.placed,
                soft_fulfilled = report.counters.soft_fulfilled,
                soft_total = report.counters.soft_total,
                finished = report.finished,
                "run complete"
            );
            return Ok(report);
        }
    };

    error!(error = %error, request_id = session.request_id(), "run aborted");
    Err(JudgeFailure {
        report: Some(report.abort(&error)),
        error,
    })
}
