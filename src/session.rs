//! Persisted sign-in session.
//!
//! The access token lives in `~/.taskdeck/session.json`. It is read once at
//! startup, written on login, and deleted on logout; nothing else touches
//! the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::{tdlog, tdlog_debug, Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    path: PathBuf,
    token: Option<String>,
}

impl AuthSession {
    /// Restore the session from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(Config::session_path()?)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        tdlog_debug!("AuthSession::load path={}", path.display());
        if !path.exists() {
            tdlog_debug!("No stored session");
            return Ok(Self { path, token: None });
        }
        let stored: StoredSession = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let token = Some(stored.access_token).filter(|t| !t.is_empty());
        Ok(Self { path, token })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The token, or `NotAuthenticated`.
    pub fn require_token(&self) -> Result<String> {
        self.token.clone().ok_or(Error::NotAuthenticated)
    }

    /// Store a fresh token, replacing any previous one.
    pub fn save(&mut self, token: String) -> Result<()> {
        write_atomic(
            &self.path,
            &serde_json::to_string_pretty(&StoredSession {
                access_token: token.clone(),
            })?,
        )?;
        tdlog!("Session saved to {}", self.path.display());
        self.token = Some(token);
        Ok(())
    }

    /// Forget the token and remove the file.
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tdlog!("Session cleared");
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            tdlog_debug!("Creating session directory: {}", dir.display());
            fs::create_dir_all(dir)?;
        }
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
