//! Domain models used by the backend: problems, submissions, verdicts, attempts.

use serde::{Deserialize, Serialize};

/// Category used when the client does not name one.
pub const DEFAULT_CATEGORY: &str = "for-loop";

/// A generated practice problem plus its reference solution.
/// Immutable once parsed; exactly one is "active" per session at a time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Problem {
  /// Natural-language problem statement shown to the learner.
  pub description: String,
  /// Reference solution code produced alongside the problem.
  pub reference_code: String,
  /// Expected output of the reference solution.
  pub reference_output: String,
}

impl Problem {
  /// True when the parser could not recover any section at all.
  pub fn is_empty(&self) -> bool {
    self.description.is_empty()
      && self.reference_code.is_empty()
      && self.reference_output.is_empty()
  }
}

/// Result of running learner code. `error` is set exclusively when execution
/// failed, in which case `raw_output` is empty.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionResult {
  pub raw_output: String,
  pub error: Option<String>,
}

impl SubmissionResult {
  /// What downstream comparison actually sees as the learner's output:
  /// the captured stdout, or the rendered error string on failure.
  pub fn observed_output(&self) -> String {
    match &self.error {
      Some(desc) => crate::sandbox::render_error(desc),
      None => self.raw_output.clone(),
    }
  }
}

/// Judge outcome. `is_correct` is derived from the rationale text, not a
/// separate structured field (see `openai::verdict_from_response`).
#[derive(Clone, Debug, Serialize)]
pub struct Verdict {
  pub is_correct: bool,
  pub rationale: String,
}

/// One graded submission, immutable once appended to a session's history.
#[derive(Clone, Debug, Serialize)]
pub struct Attempt {
  pub problem: String,
  pub code: String,
  pub output: String,
  pub is_correct: bool,
}

/// Authenticated learner identity, validated against the user registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
  pub display_name: String,
  pub id: String,
}
