//! Persistent user registry: a flat JSON file mapping student id -> name.
//!
//! This is deliberately tiny. Registration appends and persists immediately;
//! authentication is an exact match on both fields. Everything else about a
//! learner lives in the in-memory session.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{error, info, warn};

const DEFAULT_USERS_FILE: &str = "./users.json";

pub struct UserRegistry {
  path: PathBuf,
  users: HashMap<String, String>,
}

impl UserRegistry {
  /// Load the registry from USERS_FILE (default ./users.json). A missing or
  /// unreadable file starts an empty registry rather than failing startup.
  pub fn from_env() -> Self {
    let path = PathBuf::from(
      std::env::var("USERS_FILE").unwrap_or_else(|_| DEFAULT_USERS_FILE.into()),
    );
    let users = match std::fs::read_to_string(&path) {
      Ok(s) => match serde_json::from_str::<HashMap<String, String>>(&s) {
        Ok(map) => {
          info!(target: "codedrill_backend", path = %path.display(), count = map.len(), "Loaded user registry");
          map
        }
        Err(e) => {
          error!(target: "codedrill_backend", path = %path.display(), error = %e, "Failed to parse user registry; starting empty");
          HashMap::new()
        }
      },
      Err(_) => {
        warn!(target: "codedrill_backend", path = %path.display(), "No user registry file; starting empty");
        HashMap::new()
      }
    };
    Self { path, users }
  }

  #[cfg(test)]
  fn at_path(path: PathBuf) -> Self {
    Self { path, users: HashMap::new() }
  }

  /// Register a new learner. The id must be purely numeric (it is a student
  /// number) and not already taken. Persists to disk before returning.
  pub fn register(&mut self, id: &str, name: &str) -> Result<(), String> {
    if name.trim().is_empty() || id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
      return Err("Please enter a name and a numeric student id.".into());
    }
    if self.users.contains_key(id) {
      return Err("This student id is already registered.".into());
    }
    self.users.insert(id.to_string(), name.to_string());
    self.persist()?;
    info!(target: "codedrill_backend", %id, "Registered new user");
    Ok(())
  }

  /// Exact match on both id and name.
  pub fn authenticate(&self, id: &str, name: &str) -> bool {
    self.users.get(id).map(|n| n == name).unwrap_or(false)
  }

  fn persist(&self) -> Result<(), String> {
    let body = serde_json::to_string_pretty(&self.users)
      .map_err(|e| format!("Serialize user registry: {e}"))?;
    std::fs::write(&self.path, body).map_err(|e| {
      error!(target: "codedrill_backend", path = %self.path.display(), error = %e, "Failed to persist user registry");
      format!("Write user registry: {e}")
    })
  }
}
