//! Duplex link to the contestant.
//!
//! Writes are buffered and only reach the contestant at an explicit
//! [`ContestantLink::flush`]. Reads go through a single primitive,
//! [`ContestantLink::recv_line`], which gives up after the response
//! timeout.

use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, Lines,
};
use tracing::{trace, warn};

use vmjudge_core::{ViolationKind, ViolationResult};

/// The judge's end of the two byte streams shared with a contestant.
pub struct ContestantLink<R, W> {
    lines: Lines<BufReader<R>>,
    writer: BufWriter<W>,
    timeout: Duration,
}

impl<R, W> ContestantLink<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// `reader` is the contestant's output, `writer` its input.
    pub fn new(reader: R, writer: W, timeout: Duration) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            writer: BufWriter::new(writer),
            timeout,
        }
    }

    /// Queue one line for the contestant.
    pub async fn send_line(&mut self, line: &str) -> ViolationResult<()> {
        trace!(line, "judge ->");
        self.writer.write_all(line.as_bytes()).await.map_err(disconnected)?;
        self.writer.write_all(b"\n").await.map_err(disconnected)
    }

    /// Push every queued line to the contestant.
    pub async fn flush(&mut self) -> ViolationResult<()> {
        self.writer.flush().await.map_err(disconnected)
    }

    /// Wait for the next response line, trailing spaces and CR removed.
    pub async fn recv_line(&mut self) -> ViolationResult<String> {
        match tokio::time::timeout(self.timeout, self.lines.next_line()).await {
            Err(_) => Err(ViolationKind::Timeout(self.timeout)),
            Ok(Err(e)) => Err(ViolationKind::Malformed(format!("unreadable response: {e}"))),
            Ok(Ok(None)) => Err(ViolationKind::Disconnected),
            Ok(Ok(Some(line))) => {
                trace!(line = %line, "judge <-");
                Ok(line.trim_end_matches([' ', '\r']).to_string())
            }
        }
    }

    /// Best-effort "end" tag so a contestant still waiting on a request can
    /// exit. Write failures are logged and ignored.
    pub async fn send_end(&mut self) {
        let result = match self.send_line("4").await {
            Ok(()) => self.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "could not deliver end tag to contestant");
        }
    }
}

fn disconnected(err: std::io::Error) -> ViolationKind {
    trace!(error = %err, "contestant pipe closed");
    ViolationKind::Disconnected
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn lines_arrive_only_after_flush() {
        let (judge_out, mut contestant_in) = duplex(1024);
        let (_contestant_out, judge_in) = duplex(1024);
        let mut link = ContestantLink::new(judge_in, judge_out, Duration::from_secs(1));

        link.send_line("1 2 3 4").await.unwrap();
        link.send_line("2").await.unwrap();
        link.flush().await.unwrap();
        drop(link);

        let mut received = String::new();
        contestant_in.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "1 2 3 4\n2\n");
    }

    #[tokio::test]
    async fn recv_trims_line_endings() {
        let (judge_out, _contestant_in) = duplex(1024);
        let (mut contestant_out, judge_in) = duplex(1024);
        contestant_out.write_all(b"1 1 1 1 \r\n-1\n").await.unwrap();

        let mut link = ContestantLink::new(judge_in, judge_out, Duration::from_secs(1));
        assert_eq!(link.recv_line().await.unwrap(), "1 1 1 1");
        assert_eq!(link.recv_line().await.unwrap(), "-1");
    }

    #[tokio::test]
    async fn recv_times_out() {
        let (judge_out, _contestant_in) = duplex(1024);
        let (_contestant_out, judge_in) = duplex(1024);
        let timeout = Duration::from_millis(20);
        let mut link = ContestantLink::new(judge_in, judge_out, timeout);

        assert_eq!(link.recv_line().await, Err(ViolationKind::Timeout(timeout)));
    }

    #[tokio::test]
    async fn recv_reports_closed_stream() {
        let (judge_out, _contestant_in) = duplex(1024);
        let (contestant_out, judge_in) = duplex(1024);
        drop(contestant_out);
        let mut link = ContestantLink::new(judge_in, judge_out, Duration::from_secs(1));

        assert_eq!(link.recv_line().await, Err(ViolationKind::Disconnected));
    }

    #[tokio::test]
    async fn send_end_ignores_closed_pipe() {
        let (judge_out, contestant_in) = duplex(1024);
        let (_contestant_out, judge_in) = duplex(1024);
        drop(contestant_in);
        let mut link = ContestantLink::new(judge_in, judge_out, Duration::from_secs(1));

        // Must not panic or hang.
        link.send_end().await;
    }
}
