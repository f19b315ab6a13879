//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::domain::Attempt;
use crate::logic::{PipelineError, SubmissionReport};

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    pub name: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub name: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
}
#[derive(Serialize)]
pub struct LoginOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProblemIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub category: Option<String>,
}
#[derive(Serialize)]
pub struct ProblemOut {
    pub category: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct SubmitIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub code: String,
}
#[derive(Serialize)]
pub struct SubmitOut {
    pub problem: String,
    pub code: String,
    pub output: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    pub rationale: String,
    #[serde(rename = "referenceCode")]
    pub reference_code: String,
    #[serde(rename = "referenceOutput")]
    pub reference_output: String,
}

impl From<SubmissionReport> for SubmitOut {
    fn from(r: SubmissionReport) -> Self {
        SubmitOut {
            problem: r.problem.description,
            code: r.code,
            output: r.output,
            is_correct: r.verdict.is_correct,
            rationale: r.verdict.rationale,
            reference_code: r.problem.reference_code,
            reference_output: r.problem.reference_output,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}
#[derive(Serialize)]
pub struct AttemptOut {
    pub problem: String,
    pub code: String,
    pub output: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
}
impl From<Attempt> for AttemptOut {
    fn from(a: Attempt) -> Self {
        AttemptOut {
            problem: a.problem,
            code: a.code,
            output: a.output,
            is_correct: a.is_correct,
        }
    }
}
#[derive(Serialize)]
pub struct HistoryOut {
    pub attempts: Vec<AttemptOut>,
}

#[derive(Serialize)]
pub struct OkOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// Error responder
//

/// JSON error envelope returned on any failed request.
#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorOut { error: self.message })).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match &e {
            PipelineError::Unauthorized => StatusCode::UNAUTHORIZED,
            PipelineError::BadCredentials(_) => StatusCode::BAD_REQUEST,
            PipelineError::NoActiveProblem => StatusCode::CONFLICT,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError { status, message: e.to_string() }
    }
}
