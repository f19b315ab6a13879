//! Executing learner-submitted Python in a captured-output subprocess.
//!
//! Each run gets a fresh scratch directory and a fresh interpreter, so no two
//! executions can share a namespace or a capture buffer, and the parent
//! process's stdout is never touched regardless of how the run ends.
//!
//! Security note: this executes arbitrary submitted code with full interpreter
//! privileges and no resource limits. That is an accepted trade-off for a
//! single-user, trusted environment; any deployment with broader exposure
//! needs process isolation, timeouts, and resource quotas first.

use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{info, instrument};

use crate::domain::SubmissionResult;

const PYTHON_BIN: &str = "python3";

/// Human-readable rendering of an execution failure. This string is what the
/// judge receives as the learner's observed output when a submission raises.
pub fn render_error(description: &str) -> String {
  format!("Execution error: {}", description)
}

/// Run `source_text` as a standalone Python program.
///
/// On success, `raw_output` holds the captured stdout (stripped) and `error`
/// is None. On any raised exception, `error` holds the exception description
/// and `raw_output` is empty: the error path wins over partial output.
/// `Err` is reserved for infrastructure faults (scratch dir, interpreter
/// missing), which are pipeline failures rather than learner mistakes.
#[instrument(level = "info", skip(source_text), fields(code_len = source_text.len()))]
pub async fn run(source_text: &str) -> Result<SubmissionResult, String> {
  let dir = TempDir::new().map_err(|e| format!("Sandbox scratch dir: {e}"))?;
  let path = dir.path().join("submission.py");
  tokio::fs::write(&path, source_text)
    .await
    .map_err(|e| format!("Sandbox write: {e}"))?;

  // -I: isolated mode. No caller environment, no site customization, no
  // implicit import path entries; the submission sees an empty namespace.
  let output = Command::new(PYTHON_BIN)
    .arg("-I")
    .arg(&path)
    .current_dir(dir.path())
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .output()
    .await
    .map_err(|e| format!("Failed to launch {PYTHON_BIN}: {e}"))?;

  if output.status.success() {
    let raw_output = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(SubmissionResult { raw_output, error: None })
  } else {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let description = exception_description(&stderr, output.status.code());
    info!(target: "drill", %description, "Submission raised during execution");
    Ok(SubmissionResult { raw_output: String::new(), error: Some(description) })
  }
}

/// The last non-empty stderr line is the interpreter's exception summary
/// (e.g. "ZeroDivisionError: division by zero"); the traceback frames above
/// it are noise for grading purposes.
fn exception_description(stderr: &str, code: Option<i32>) -> String {
  stderr
    .lines()
    .rev()
    .find(|l| !l.trim().is_empty())
    .map(|l| l.trim().to_string())
    .unwrap_or_else(|| format!("process exited with status {:?}", code))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn captures_stdout_of_a_clean_run() {
    let res = run("print(\"hi\")").await.expect("run");
    assert_eq!(res.raw_output, "hi");
    assert!(res.error.is_none());
    assert_eq!(res.observed_output(), "hi");
  }

  #[tokio::test]
  async fn surfaces_a_raised_exception_as_error() {
    let res = run("1/0").await.expect("run");
    assert_eq!(res.raw_output, "");
    let err = res.error.clone().expect("error set");
    assert!(err.contains("division by zero"), "got: {err}");
    assert!(res.observed_output().starts_with("Execution error:"));
  }

  #[tokio::test]
  async fn error_path_wins_over_partial_output() {
    let res = run("print(\"partial\")\nraise ValueError(\"boom\")")
      .await
      .expect("run");
    assert_eq!(res.raw_output, "");
    assert!(res.error.expect("error set").contains("boom"));
  }

  #[tokio::test]
  async fn runs_stay_isolated_across_outcomes() {
    // A raising run must not leak state or break capture for the next run.
    let _ = run("raise RuntimeError(\"first\")").await.expect("run");
    let res = run("x = 2 + 2\nprint(x)").await.expect("run");
    assert_eq!(res.raw_output, "4");
    assert!(res.error.is_none());
  }

  #[tokio::test]
  async fn submission_namespace_is_empty() {
    // Names from one submission must not be visible to another.
    let _ = run("leaked = 42").await.expect("run");
    let res = run("print(leaked)").await.expect("run");
    assert!(res.error.expect("NameError expected").contains("NameError"));
  }
}
