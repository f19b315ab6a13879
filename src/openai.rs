//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions with plain-text responses: once to author a
//! problem, once to judge a submission. Calls are instrumented and log model
//! names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::Verdict;
use crate::util::fill_template;

/// Fixed phrase the judge prompt asks for on a correct solution. The verdict
/// is a substring test against this token, nothing more.
pub const AFFIRMATIVE_MARKER: &str = "CORRECT ANSWER";

/// Sampling temperatures: generation favors variety, judging favors
/// consistency.
const GENERATION_TEMPERATURE: f32 = 0.7;
const JUDGE_TEMPERATURE: f32 = 0.5;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4-turbo".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Plain-text chat completion. Transport/API failures propagate to the
  /// caller as-is: there is no retry and no local fallback.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_plain(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "codedrill-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Ask the model to author one practice problem for `category`.
  /// Returns the raw unparsed text; structure validation happens in the
  /// parser, not here.
  #[instrument(level = "info", skip(self, prompts), fields(%category, model = %self.model))]
  pub async fn generate_problem(
    &self,
    prompts: &Prompts,
    category: &str,
  ) -> Result<String, String> {
    let user = fill_template(&prompts.generation_user_template, &[("category", category)]);
    let start = std::time::Instant::now();
    let result = self
      .chat_plain(&prompts.generation_system, &user, GENERATION_TEMPERATURE)
      .await;
    let elapsed = start.elapsed();

    match &result {
      Ok(text) => info!(?elapsed, response_len = text.len(), "Problem generation response received"),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during problem generation"),
    }
    result
  }

  /// Ask the model whether the learner's code logically solves the problem.
  /// The verdict is derived by substring-matching the affirmative phrase in
  /// the raw response (see `verdict_from_response`).
  #[instrument(
    level = "info",
    skip_all,
    fields(model = %self.model, code_len = learner_code.len(), output_len = learner_output.len())
  )]
  pub async fn judge_solution(
    &self,
    prompts: &Prompts,
    problem: &str,
    learner_code: &str,
    learner_output: &str,
    reference_code: &str,
    reference_output: &str,
  ) -> Result<Verdict, String> {
    let user = fill_template(
      &prompts.judge_user_template,
      &[
        ("problem", problem),
        ("reference_code", reference_code),
        ("reference_output", reference_output),
        ("learner_code", learner_code),
        ("learner_output", learner_output),
      ],
    );

    let raw = self.chat_plain(&prompts.judge_system, &user, JUDGE_TEMPERATURE).await?;
    let verdict = verdict_from_response(&raw);
    info!(is_correct = verdict.is_correct, rationale_len = verdict.rationale.len(), "Judge verdict derived");
    Ok(verdict)
  }
}

/// Classify a raw judge response. Deliberately loose: `is_correct` is true iff
/// the response contains the affirmative phrase anywhere, so a rationale that
/// merely *mentions* the phrase while arguing against it is misclassified as
/// correct. Known limitation, kept on purpose.
pub fn verdict_from_response(raw: &str) -> Verdict {
  Verdict {
    is_correct: raw.contains(AFFIRMATIVE_MARKER),
    rationale: raw.trim().to_string(),
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn affirmative_phrase_marks_correct() {
    let v = verdict_from_response("CORRECT ANSWER. The loop prints 1 through 5 as required.");
    assert!(v.is_correct);
    assert!(v.rationale.contains("loop"));
  }

  #[test]
  fn negative_phrase_marks_incorrect() {
    let v = verdict_from_response("WRONG ANSWER. The output is off by one.");
    assert!(!v.is_correct);
  }

  #[test]
  fn affirmative_inside_a_negative_sentence_still_classifies_correct() {
    // Documented limitation of the substring classifier, preserved on purpose.
    let v = verdict_from_response(
      "This is not a CORRECT ANSWER because the code never terminates.",
    );
    assert!(v.is_correct);
  }

  #[test]
  fn unrelated_response_classifies_incorrect() {
    let v = verdict_from_response("The code looks correct and the answer matches.");
    assert!(!v.is_correct, "lowercase prose must not match the fixed phrase");
  }
}
