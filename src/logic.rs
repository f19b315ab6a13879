//! Core behaviors shared by the HTTP handlers: the generation → execution →
//! grading pipeline, plus registration/login plumbing.
//!
//! The pipeline for one submission is strictly sequential: run the learner's
//! code to completion first, then judge, since the judge prompt depends on the
//! execution result. A crashing submission is NOT short-circuited: the
//! rendered error string is sent to the judge as the learner's observed
//! output, and the judge may grade it either way.

use std::fmt;

use tracing::{error, info, instrument, warn};

use crate::domain::{Attempt, Identity, Problem, Verdict, DEFAULT_CATEGORY};
use crate::parser::parse_problem_response;
use crate::sandbox;
use crate::state::AppState;

/// How a pipeline operation failed. Execution faults are NOT errors here:
/// they are captured as data and flow on to the judge.
#[derive(Debug)]
pub enum PipelineError {
  /// Session id unknown or expired.
  Unauthorized,
  /// Credentials rejected (register/login).
  BadCredentials(String),
  /// A submission arrived with no active problem for the session.
  NoActiveProblem,
  /// Outbound model call failed (network, auth, quota) or is unconfigured.
  /// Surfaced as a hard failure; no retry.
  Upstream(String),
  /// Local infrastructure fault (scratch dir, interpreter missing).
  Internal(String),
}

impl fmt::Display for PipelineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PipelineError::Unauthorized => write!(f, "Not logged in."),
      PipelineError::BadCredentials(m) => write!(f, "{}", m),
      PipelineError::NoActiveProblem => {
        write!(f, "No active problem. Generate a problem before submitting.")
      }
      PipelineError::Upstream(m) => write!(f, "Model call failed, please try again: {}", m),
      PipelineError::Internal(m) => write!(f, "{}", m),
    }
  }
}

/// Everything the result view needs for one graded submission.
#[derive(Debug)]
pub struct SubmissionReport {
  pub problem: Problem,
  pub code: String,
  /// Captured stdout, or the rendered error string on an execution fault.
  pub output: String,
  pub verdict: Verdict,
}

/// Create a registry entry. Fails on duplicate or malformed credentials.
#[instrument(level = "info", skip(state, name), fields(%student_id))]
pub async fn register_user(
  state: &AppState,
  student_id: &str,
  name: &str,
) -> Result<(), PipelineError> {
  state
    .registry
    .write()
    .await
    .register(student_id, name)
    .map_err(PipelineError::BadCredentials)
}

/// Authenticate against the registry and open a fresh session.
#[instrument(level = "info", skip(state, name), fields(%student_id))]
pub async fn login_user(
  state: &AppState,
  student_id: &str,
  name: &str,
) -> Result<(String, Identity), PipelineError> {
  let ok = state.registry.read().await.authenticate(student_id, name);
  if !ok {
    warn!(target: "drill", %student_id, "Login rejected");
    return Err(PipelineError::BadCredentials(
      "Not registered, or the name and student id do not match.".into(),
    ));
  }
  let identity = Identity { display_name: name.to_string(), id: student_id.to_string() };
  let session_id = state.open_session(identity.clone()).await;
  Ok((session_id, identity))
}

/// Generate a fresh problem for the session and make it the active one,
/// replacing any prior active problem.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn generate_problem(
  state: &AppState,
  session_id: &str,
  category: Option<String>,
) -> Result<(String, Problem), PipelineError> {
  if state.session_identity(session_id).await.is_none() {
    return Err(PipelineError::Unauthorized);
  }
  let category = category
    .filter(|c| !c.trim().is_empty())
    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

  let oa = state
    .openai
    .as_ref()
    .ok_or_else(|| PipelineError::Upstream("OpenAI is not configured".into()))?;
  let raw = oa
    .generate_problem(&state.prompts, &category)
    .await
    .map_err(PipelineError::Upstream)?;

  let problem = parse_problem_response(&raw);
  if problem.is_empty() {
    // Soft failure: the parser found no markers. We still store the (empty)
    // problem; the learner will see a blank statement and can regenerate.
    warn!(target: "drill", %session_id, %category, "Generator response had no recognizable sections");
  }

  if !state.set_active_problem(session_id, problem.clone()).await {
    return Err(PipelineError::Unauthorized);
  }
  info!(target: "drill", %session_id, %category, desc_len = problem.description.len(), "Problem generated and set active");
  Ok((category, problem))
}

/// Execute the learner's code, judge it against the active problem, and
/// append the graded attempt to the session history.
#[instrument(level = "info", skip(state, code), fields(%session_id, code_len = code.len()))]
pub async fn submit_solution(
  state: &AppState,
  session_id: &str,
  code: &str,
) -> Result<SubmissionReport, PipelineError> {
  if state.session_identity(session_id).await.is_none() {
    return Err(PipelineError::Unauthorized);
  }
  let problem = state
    .active_problem(session_id)
    .await
    .ok_or(PipelineError::NoActiveProblem)?;

  // Execution first; the judge prompt depends on its result. A raised
  // exception becomes data, not a pipeline failure.
  let result = sandbox::run(code).await.map_err(PipelineError::Internal)?;
  let output = result.observed_output();

  let oa = state
    .openai
    .as_ref()
    .ok_or_else(|| PipelineError::Upstream("OpenAI is not configured".into()))?;
  let verdict = oa
    .judge_solution(
      &state.prompts,
      &problem.description,
      code,
      &output,
      &problem.reference_code,
      &problem.reference_output,
    )
    .await
    .map_err(|e| {
      error!(target: "drill", %session_id, error = %e, "Judge call failed");
      PipelineError::Upstream(e)
    })?;

  let attempt = Attempt {
    problem: problem.description.clone(),
    code: code.to_string(),
    output: output.clone(),
    is_correct: verdict.is_correct,
  };
  state.append_attempt(session_id, attempt).await;
  info!(target: "drill", %session_id, is_correct = verdict.is_correct, "Submission graded");

  Ok(SubmissionReport { problem, code: code.to_string(), output, verdict })
}

/// Full attempt history for the session, oldest first.
pub async fn get_history(
  state: &AppState,
  session_id: &str,
) -> Result<Vec<Attempt>, PipelineError> {
  state
    .history(session_id)
    .await
    .ok_or(PipelineError::Unauthorized)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity() -> Identity {
    Identity { display_name: "Alex".into(), id: "20251234".into() }
  }

  #[tokio::test]
  async fn generate_requires_a_session() {
    let state = AppState::for_tests();
    let err = generate_problem(&state, "nope", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Unauthorized));
  }

  #[tokio::test]
  async fn generate_without_openai_is_a_hard_failure() {
    let state = AppState::for_tests();
    let sid = state.open_session(identity()).await;
    let err = generate_problem(&state, &sid, None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Upstream(_)));
    // The failure must not leave a stale active problem behind.
    assert!(state.active_problem(&sid).await.is_none());
  }

  #[tokio::test]
  async fn submit_without_active_problem_is_rejected() {
    let state = AppState::for_tests();
    let sid = state.open_session(identity()).await;
    let err = submit_solution(&state, &sid, "print(1)").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoActiveProblem));
    // Nothing gets appended to history on a rejected submission.
    assert!(state.history(&sid).await.expect("history").is_empty());
  }

  #[tokio::test]
  async fn reference_solution_reproduces_reference_output() {
    // A well-formed generator response, shaped like the generation prompt
    // asks for. Submitting the reference code itself must reproduce the
    // reference output exactly.
    use crate::parser::{MARKER_CODE, MARKER_OUTPUT, MARKER_PROBLEM};
    let raw = format!(
      "{MARKER_PROBLEM}\nPrint the squares of 1 to 3, one per line.\n\n\
       {MARKER_CODE}\nfor i in range(1, 4):\n    print(i * i)\n\n\
       {MARKER_OUTPUT}\n1\n4\n9"
    );
    let problem = parse_problem_response(&raw);
    assert!(!problem.description.is_empty());

    let res = sandbox::run(&problem.reference_code).await.expect("run");
    assert!(res.error.is_none());
    assert_eq!(res.raw_output, problem.reference_output);
  }

  #[tokio::test]
  async fn history_requires_a_session() {
    let state = AppState::for_tests();
    assert!(matches!(
      get_history(&state, "nope").await.unwrap_err(),
      PipelineError::Unauthorized
    ));
  }
}
