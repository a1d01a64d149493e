use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::task::{DEFAULT_CATEGORY, DEFAULT_PRIORITY};
use crate::{tdlog_debug, Error, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const API_URL_ENV: &str = "TASKDECK_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub default_category: Option<String>,
    pub default_priority: Option<i64>,
}

impl Config {
    pub fn taskdeck_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskdeck"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::taskdeck_dir()?.join("taskdeck.toml"))
    }

    pub fn session_path() -> Result<PathBuf> {
        Ok(Self::taskdeck_dir()?.join("session.json"))
    }

    pub fn effective_api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }

    pub fn effective_category(&self) -> &str {
        self.default_category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn effective_priority(&self) -> i64 {
        self.default_priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Apply `TASKDECK_API_URL` and then an explicit `--api-url` flag, in
    /// that order of increasing precedence.
    pub fn with_overrides(mut self, env_url: Option<String>, flag_url: Option<String>) -> Self {
        if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(url) = flag_url {
            self.api_url = Some(url);
        }
        self
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        tdlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tdlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        tdlog_debug!(
            "Config loaded: api_url={:?}, default_category={:?}, default_priority={:?}",
            config.api_url,
            config.default_category,
            config.default_priority
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                tdlog_debug!("Creating config directory: {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tdlog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
