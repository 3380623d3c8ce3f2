//! Session error types.

use thiserror::Error;

use vmjudge_core::{ProblemError, Violation};

use crate::report::RunReport;

/// Errors that can end a judging session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The contestant broke the protocol or a placement rule.
    #[error(transparent)]
    Violation(#[from] Violation),

    #[error("malformed problem input: {0}")]
    Problem(#[from] ProblemError),

    #[error("malformed baseline file: {0}")]
    Baseline(ProblemError),

    #[error("failed to launch contestant: {0}")]
    Spawn(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the contestant, rather than the judge's inputs, is at fault.
    pub fn is_violation(&self) -> bool {
        matches!(self, SessionError::Violation(_))
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// A run that did not complete cleanly.
///
/// `report` holds the counters accumulated before the failure, or `None`
/// when the session never started.
#[derive(Debug, Error)]
#[error("run aborted: {error}")]
pub struct JudgeFailure {
    pub report: Option<RunReport>,
    pub error: SessionError,
}

impl JudgeFailure {
    pub fn before_start(error: impl Into<SessionError>) -> Self {
        Self {
            report: None,
            error: error.into(),
        }
    }
}
