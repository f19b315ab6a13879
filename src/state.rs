//! Application state: the user registry, per-session state, prompts, and the
//! OpenAI client.
//!
//! Session state is scoped strictly per session id. The active problem lives
//! inside `Session`, never in a process-wide slot, so concurrent sessions
//! cannot grade against each other's problems. History and the active problem
//! are torn down together on logout.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_agent_config_from_env, Prompts};
use crate::domain::{Attempt, Identity, Problem};
use crate::openai::OpenAI;
use crate::registry::UserRegistry;

/// Per-session state: who is logged in, what problem they are solving, and
/// what they have attempted so far.
pub struct Session {
    pub identity: Identity,
    pub active_problem: Option<Problem>,
    pub history: Vec<Attempt>,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub registry: Arc<RwLock<UserRegistry>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, load the user registry, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_agent_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();

        let registry = UserRegistry::from_env();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "codedrill_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            warn!(target: "codedrill_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation and judging will fail.");
        }

        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            registry: Arc::new(RwLock::new(registry)),
            openai,
            prompts,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            registry: Arc::new(RwLock::new(UserRegistry::from_env())),
            openai: None,
            prompts: Prompts::default(),
        }
    }

    /// Open a session for an authenticated identity. Returns the session id
    /// the client must echo back on subsequent calls.
    #[instrument(level = "info", skip(self), fields(id = %identity.id))]
    pub async fn open_session(&self, identity: Identity) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            identity,
            active_problem: None,
            history: Vec::new(),
        };
        self.sessions.write().await.insert(session_id.clone(), session);
        info!(target: "drill", %session_id, "Session opened");
        session_id
    }

    /// Tear down a session: identity, active problem, and history all go
    /// together. Returns false for an unknown session id.
    #[instrument(level = "info", skip(self), fields(%session_id))]
    pub async fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(target: "drill", %session_id, "Session closed");
        }
        removed
    }

    /// The identity bound to a session, if the session exists.
    pub async fn session_identity(&self, session_id: &str) -> Option<Identity> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.identity.clone())
    }

    /// Store the freshly generated problem, replacing any prior active one.
    /// Returns false for an unknown session id.
    #[instrument(level = "debug", skip(self, problem), fields(%session_id))]
    pub async fn set_active_problem(&self, session_id: &str, problem: Problem) -> bool {
        match self.sessions.write().await.get_mut(session_id) {
            Some(s) => {
                s.active_problem = Some(problem);
                true
            }
            None => false,
        }
    }

    /// The problem currently eligible for grading in this session.
    pub async fn active_problem(&self, session_id: &str) -> Option<Problem> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.active_problem.clone())
    }

    /// Append one graded attempt to the session's ordered history.
    /// Returns false for an unknown session id.
    #[instrument(level = "debug", skip(self, attempt), fields(%session_id, is_correct = attempt.is_correct))]
    pub async fn append_attempt(&self, session_id: &str, attempt: Attempt) -> bool {
        match self.sessions.write().await.get_mut(session_id) {
            Some(s) => {
                s.history.push(attempt);
                true
            }
            None => false,
        }
    }

    /// Full attempt history in submission order, oldest first.
    pub async fn history(&self, session_id: &str) -> Option<Vec<Attempt>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity { display_name: "Alex".into(), id: "20251234".into() }
    }

    fn problem(tag: &str) -> Problem {
        Problem {
            description: format!("problem {tag}"),
            reference_code: format!("print('{tag}')"),
            reference_output: tag.to_string(),
        }
    }

    fn attempt(tag: &str) -> Attempt {
        Attempt {
            problem: format!("problem {tag}"),
            code: format!("print('{tag}')"),
            output: tag.to_string(),
            is_correct: false,
        }
    }

    #[tokio::test]
    async fn no_active_problem_before_first_generate() {
        let state = AppState::for_tests();
        let sid = state.open_session(identity()).await;
        assert!(state.active_problem(&sid).await.is_none());
    }

    #[tokio::test]
    async fn active_problem_is_replaced_not_accumulated() {
        let state = AppState::for_tests();
        let sid = state.open_session(identity()).await;
        assert!(state.set_active_problem(&sid, problem("one")).await);
        assert!(state.set_active_problem(&sid, problem("two")).await);
        let active = state.active_problem(&sid).await.expect("active");
        assert_eq!(active.description, "problem two");
    }

    #[tokio::test]
    async fn history_preserves_append_order_without_dedup() {
        let state = AppState::for_tests();
        let sid = state.open_session(identity()).await;
        for tag in ["a", "b", "c", "b"] {
            assert!(state.append_attempt(&sid, attempt(tag)).await);
        }
        let history = state.history(&sid).await.expect("history");
        let tags: Vec<&str> = history.iter().map(|a| a.output.as_str()).collect();
        assert_eq!(tags, vec!["a", "b", "c", "b"]);
    }

    #[tokio::test]
    async fn close_session_clears_problem_and_history_together() {
        let state = AppState::for_tests();
        let sid = state.open_session(identity()).await;
        state.set_active_problem(&sid, problem("one")).await;
        state.append_attempt(&sid, attempt("one")).await;

        assert!(state.close_session(&sid).await);
        assert!(state.active_problem(&sid).await.is_none());
        assert!(state.history(&sid).await.is_none());
        assert!(!state.close_session(&sid).await);
    }

    #[tokio::test]
    async fn sessions_do_not_share_state() {
        let state = AppState::for_tests();
        let sid_a = state.open_session(identity()).await;
        let sid_b = state.open_session(identity()).await;
        state.set_active_problem(&sid_a, problem("a")).await;
        state.append_attempt(&sid_a, attempt("a")).await;

        assert!(state.active_problem(&sid_b).await.is_none());
        assert!(state.history(&sid_b).await.expect("history").is_empty());
    }
}
