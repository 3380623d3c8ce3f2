//! Problem and baseline input readers.
//!
//! The problem stream is line-oriented with space-separated integers.
//! Every error carries the 1-based line number it was found on.

use std::path::Path;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use vmjudge_core::{BaselineScore, ProblemError};

use crate::error::{SessionError, SessionResult};

/// Line reader over the problem description.
pub struct ProblemReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R> ProblemReader<R> {
    /// 1-based number of the last line returned.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Error pinned to the current line.
    pub fn error(&self, message: impl Into<String>) -> ProblemError {
        ProblemError::new(self.line_no, message)
    }
}

impl<R: AsyncBufRead + Unpin> ProblemReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Next raw line with trailing whitespace removed.
    pub async fn next_line(&mut self) -> SessionResult<String> {
        self.line_no += 1;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim_end().to_string()),
            None => Err(self.error("unexpected end of problem input").into()),
        }
    }

    /// Next line parsed as a list of numbers.
    pub async fn next_numbers<T: FromStr>(&mut self) -> SessionResult<Vec<T>> {
        let line = self.next_line().await?;
        parse_numbers(&line).map_err(|token| self.error(format!("invalid number {token:?}")).into())
    }

    /// Next line parsed as exactly `N` numbers.
    pub async fn next_array<T: FromStr + Copy + Default, const N: usize>(
        &mut self,
    ) -> SessionResult<[T; N]> {
        let values = self.next_numbers::<T>().await?;
        if values.len() != N {
            return Err(self
                .error(format!("expected {N} values, found {}", values.len()))
                .into());
        }
        let mut out = [T::default(); N];
        out.copy_from_slice(&values);
        Ok(out)
    }
}

/// Split on whitespace and parse each token, returning the first bad token.
pub fn parse_numbers<T: FromStr>(line: &str) -> Result<Vec<T>, String> {
    line.split_whitespace()
        .map(|token| token.parse::<T>().map_err(|_| token.to_string()))
        .collect()
}

/// Parse a baseline file: one line, `placements soft_constraints_achieved`.
pub fn parse_baseline(text: &str) -> Result<BaselineScore, ProblemError> {
    let line = text.lines().next().unwrap_or("");
    match parse_numbers::<u64>(line).as_deref() {
        Ok([placed, soft_fulfilled]) => Ok(BaselineScore {
            placed: *placed,
            soft_fulfilled: *soft_fulfilled,
        }),
        Ok(values) => Err(ProblemError::new(
            1,
            format!("expected 2 values, found {}", values.len()),
        )),
        Err(token) => Err(ProblemError::new(1, format!("invalid number {token:?}"))),
    }
}

pub async fn read_baseline(path: &Path) -> SessionResult<BaselineScore> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_baseline(&text).map_err(SessionError::Baseline)
}
