//! Contestant process management.
//!
//! Spawns the contestant with piped stdin/stdout (stderr passes through),
//! hands the pipes out as a [`ContestantLink`], and reaps the process when
//! the session is over.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use vmjudge_core::{ViolationKind, ViolationResult};

use crate::error::{SessionError, SessionResult};
use crate::link::ContestantLink;

pub type ProcessLink = ContestantLink<ChildStdout, ChildStdin>;

/// A running contestant.
pub struct ContestantProcess {
    child: Child,
    program: String,
}

impl ContestantProcess {
    /// Launch `command[0]` with the remaining arguments.
    pub fn spawn(command: &[String], response_timeout: Duration) -> SessionResult<(Self, ProcessLink)> {
        let Some((program, args)) = command.split_first() else {
            return Err(SessionError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty contestant command",
            )));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(SessionError::Spawn)?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            return Err(SessionError::Spawn(std::io::Error::other(
                "contestant pipes unavailable",
            )));
        };

        info!(program = %program, pid = child.id(), "contestant started");
        let link = ContestantLink::new(stdout, stdin, response_timeout);
        Ok((
            Self {
                child,
                program: program.clone(),
            },
            link,
        ))
    }

    /// Wait for the contestant to exit, killing it after `timeout`.
    ///
    /// The link must have been dropped first so the contestant sees EOF on
    /// its input. A non-zero exit or a forced kill is a violation.
    pub async fn finish(mut self, timeout: Duration) -> ViolationResult<()> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                debug!(program = %self.program, "contestant exited cleanly");
                Ok(())
            }
            Ok(Ok(status)) => {
                warn!(program = %self.program, %status, "contestant failed");
                Err(ViolationKind::Exit(status.to_string()))
            }
            Ok(Err(e)) => Err(ViolationKind::Exit(format!("unknown status ({e})"))),
            Err(_) => {
                warn!(program = %self.program, ?timeout, "contestant did not exit; killing");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "failed to kill contestant");
                }
                Err(ViolationKind::Exit(format!("still running {timeout:?} after the last request")))
            }
        }
    }
}
