//! Runner tests against real contestant processes.
//!
//! Contestants are `sh` one-liners that print their answers up front and
//! then drain stdin until the judge closes it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vmjudge_core::ViolationKind;
use vmjudge_session::{JudgeOptions, SessionError, extract_score, run_judge};

/// 1×1×1×1 cluster with a (4, 4) NUMA, one (1, 2, 2) type, an
/// unconstrained group, one placement, its release, and the end tag.
const TINY: &str = "1 1 1 1\n4 4\n1\n1 2 2\n1\n1 0 0\n0 0\n2\n1 1 1 -1\n1\n3\n1 1\n4\n";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// A contestant that answers with `lines` regardless of what it is sent.
fn contestant(lines: &[&str], exit_code: i32) -> Vec<String> {
    let answers = lines
        .iter()
        .map(|l| format!("'{l}'"))
        .collect::<Vec<_>>()
        .join(" ");
    let script = if lines.is_empty() {
        format!("cat > /dev/null; exit {exit_code}")
    } else {
        format!("printf '%s\\n' {answers}; cat > /dev/null; exit {exit_code}")
    };
    vec!["sh".to_string(), "-c".to_string(), script]
}

/// Like [`contestant`], but keeps everything it receives in `log`.
fn recording_contestant(lines: &[&str], log: &Path) -> Vec<String> {
    let answers = lines
        .iter()
        .map(|l| format!("'{l}'"))
        .collect::<Vec<_>>()
        .join(" ");
    let script = format!("printf '%s\\n' {answers}; cat > '{}'", log.display());
    vec!["sh".to_string(), "-c".to_string(), script]
}

/// Everything the judge forwards from [`TINY`] up to the placement batch.
const TINY_UP_TO_BATCH: &str = "1 1 1 1\n4 4\n1\n1 2 2\n1\n1 0 0\n0 0\n2\n1 1 1 -1\n1\n";

fn options(problem: PathBuf, command: Vec<String>) -> JudgeOptions {
    let mut options = JudgeOptions::new(problem, command);
    options.response_timeout = Duration::from_secs(5);
    options.shutdown_timeout = Duration::from_secs(5);
    options
}

#[tokio::test]
async fn completed_run_is_scored_against_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);
    let baseline = write(dir.path(), "01.a", "2 1\n");

    let opts = options(problem, contestant(&["1 1 1 1"], 0)).with_baseline(baseline);
    let report = run_judge(&opts).await.unwrap();

    assert!(report.finished);
    assert_eq!(report.counters.placed, 1);
    assert_eq!(report.counters.soft_total, 0);
    assert_eq!(report.requests, 4);
    // 0.8 * 1/2 + 0.2 * 0/1
    assert_eq!(extract_score(&report.to_string()), 400.0);
}

#[tokio::test]
async fn completed_run_without_baseline_is_unscored() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);

    let report = run_judge(&options(problem, contestant(&["1 1 1 1"], 0)))
        .await
        .unwrap();

    assert!(report.finished);
    assert_eq!(report.score, None);
}

#[tokio::test]
async fn declined_batch_ends_unfinished_but_scored() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);
    let baseline = write(dir.path(), "01.a", "1 0\n");

    let opts = options(problem, contestant(&["-1"], 0)).with_baseline(baseline);
    let report = run_judge(&opts).await.unwrap();

    assert!(!report.finished);
    assert_eq!(report.counters.placed, 0);
    assert_eq!(report.score, Some(0.0));
    assert!(report.to_string().contains("Not all requests processed."));
}

#[tokio::test]
async fn violation_aborts_with_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);
    let baseline = write(dir.path(), "01.a", "1 0\n");

    let opts = options(problem, contestant(&["1 2 1 1"], 0)).with_baseline(baseline);
    let failure = run_judge(&opts).await.unwrap_err();

    match &failure.error {
        SessionError::Violation(v) => {
            assert_eq!(v.request_id, 2);
            assert!(matches!(v.kind, ViolationKind::OutOfRange { field: "rack", .. }));
        }
        other => panic!("expected violation, got {other:?}"),
    }
    let report = failure.report.expect("session started, so a report exists");
    assert!(!report.finished);
    assert_eq!(report.score, None);
    assert_eq!(extract_score(&report.to_string()), 0.0);
}

#[tokio::test]
async fn nonzero_exit_fails_a_completed_run() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);

    let failure = run_judge(&options(problem, contestant(&["1 1 1 1"], 3)))
        .await
        .unwrap_err();

    assert!(failure.error.is_violation());
    match failure.error {
        SessionError::Violation(v) => assert!(matches!(v.kind, ViolationKind::Exit(_))),
        other => panic!("expected exit violation, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_baseline_fails_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);

    let opts = options(problem, contestant(&[], 0)).with_baseline(dir.path().join("missing.a"));
    let failure = run_judge(&opts).await.unwrap_err();

    assert!(failure.report.is_none());
    assert!(matches!(failure.error, SessionError::Io(_)));
}

#[tokio::test]
async fn unknown_program_fails_to_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);

    let opts = options(problem, vec!["/nonexistent/contestant".to_string()]);
    let failure = run_judge(&opts).await.unwrap_err();

    assert!(matches!(failure.error, SessionError::Spawn(_)));
}

#[tokio::test]
async fn contestant_is_told_to_stop_after_a_violation() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);
    let log = dir.path().join("received");

    let failure = run_judge(&options(problem, recording_contestant(&["1 2 1 1"], &log)))
        .await
        .unwrap_err();
    assert!(failure.error.is_violation());

    let received = std::fs::read_to_string(&log).unwrap();
    assert_eq!(received, format!("{TINY_UP_TO_BATCH}4\n"));
    assert_eq!(received.lines().last(), Some("4"));
}

#[tokio::test]
async fn contestant_is_told_to_stop_after_declining() {
    let dir = tempfile::tempdir().unwrap();
    let problem = write(dir.path(), "01", TINY);
    let log = dir.path().join("received");

    let report = run_judge(&options(problem, recording_contestant(&["-1"], &log)))
        .await
        .unwrap();
    assert!(!report.finished);

    let received = std::fs::read_to_string(&log).unwrap();
    assert_eq!(received, format!("{TINY_UP_TO_BATCH}4\n"));
}
