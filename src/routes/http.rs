//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  Json,
};
use tracing::{info, instrument};

use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(student_id = %body.student_id))]
pub async fn http_post_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> Result<Json<OkOut>, ApiError> {
  register_user(&state, &body.student_id, &body.name).await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body), fields(student_id = %body.student_id))]
pub async fn http_post_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<Json<LoginOut>, ApiError> {
  let (session_id, identity) = login_user(&state, &body.student_id, &body.name).await?;
  info!(target: "drill", student_id = %identity.id, "HTTP login accepted");
  Ok(Json(LoginOut { session_id, name: identity.display_name }))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id))]
pub async fn http_post_logout(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LogoutIn>,
) -> Json<OkOut> {
  let ok = state.close_session(&body.session_id).await;
  Json(OkOut { ok })
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id))]
pub async fn http_post_problem(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ProblemIn>,
) -> Result<Json<ProblemOut>, ApiError> {
  let (category, problem) = generate_problem(&state, &body.session_id, body.category).await?;
  info!(target: "drill", session_id = %body.session_id, %category, "HTTP problem served");
  Ok(Json(ProblemOut { category, description: problem.description }))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id, code_len = body.code.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubmitIn>,
) -> Result<Json<SubmitOut>, ApiError> {
  let report = submit_solution(&state, &body.session_id, &body.code).await?;
  info!(target: "drill", session_id = %body.session_id, is_correct = report.verdict.is_correct, "HTTP submission graded");
  Ok(Json(SubmitOut::from(report)))
}

#[instrument(level = "info", skip(state), fields(%q.session_id))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Query(q): Query<HistoryQuery>,
) -> Result<Json<HistoryOut>, ApiError> {
  let attempts = get_history(&state, &q.session_id).await?;
  Ok(Json(HistoryOut {
    attempts: attempts.into_iter().map(AttemptOut::from).collect(),
  }))
}
