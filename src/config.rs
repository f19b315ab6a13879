//! Loading agent configuration (prompt overrides) from TOML.
//!
//! See `AgentConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::parser::{MARKER_CODE, MARKER_OUTPUT, MARKER_PROBLEM};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the OpenAI client. Defaults are sensible for beginner
/// Python drills. You can override them in TOML to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Problem generation
  pub generation_system: String,
  pub generation_user_template: String,
  // Equivalence judging
  pub judge_system: String,
  pub judge_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system:
        "You are a Python practice problem author for beginners. Follow the requested output format exactly.".into(),
      generation_user_template: format!(
        "Create one beginner-level practice problem that exercises the Python {{category}} construct. \
         Output the problem statement, the solution code, and the solution output as three clearly \
         separated sections, exactly in the format below. The code must be self-contained: no user \
         input reads, all values assigned to variables.\n\n\
         Example format:\n\
         {MARKER_PROBLEM}\n<problem description>\n\n\
         {MARKER_CODE}\n<runnable Python code>\n\n\
         {MARKER_OUTPUT}\n<execution result>"
      ),
      judge_system:
        "You are a strict but fair Python grader. Judge by logical equivalence of behavior, not textual equality.".into(),
      judge_user_template: format!(
        "{MARKER_PROBLEM}\n{{problem}}\n\n\
         ### Reference code:\n{{reference_code}}\n\n\
         ### Reference output:\n{{reference_output}}\n\n\
         ### Learner code:\n{{learner_code}}\n\n\
         ### Learner output:\n{{learner_output}}\n\n\
         The learner's code may differ from the reference code. If it logically solves the stated \
         problem correctly, reply 'CORRECT ANSWER'. If it does not, reply clearly 'WRONG ANSWER'. \
         Explain your reasoning either way."
      ),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "codedrill_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "codedrill_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codedrill_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::fill_template;

  #[test]
  fn default_generation_prompt_carries_all_three_markers() {
    let p = Prompts::default();
    let user = fill_template(&p.generation_user_template, &[("category", "while-loop")]);
    assert!(user.contains("while-loop"));
    assert!(user.contains(MARKER_PROBLEM));
    assert!(user.contains(MARKER_CODE));
    assert!(user.contains(MARKER_OUTPUT));
  }

  #[test]
  fn default_judge_prompt_fills_all_five_fields() {
    let p = Prompts::default();
    let user = fill_template(
      &p.judge_user_template,
      &[
        ("problem", "P"),
        ("reference_code", "RC"),
        ("reference_output", "RO"),
        ("learner_code", "LC"),
        ("learner_output", "LO"),
      ],
    );
    for v in ["P", "RC", "RO", "LC", "LO"] {
      assert!(user.contains(v), "missing {v}");
    }
    assert!(!user.contains('{'), "unfilled placeholder left in prompt: {user}");
  }
}
