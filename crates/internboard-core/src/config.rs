//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend base URLs, the last used username, request timeout and the
//! work timer guard policy.
//!
//! Configuration is stored at `~/.config/internboard/config.json`.
//! `INTERNBOARD_ACCOUNTS_URL` and `INTERNBOARD_SCHEDULER_URL` override the
//! stored URLs.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::timer::GuardPolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "internboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_ACCOUNTS_URL: &str = "http://127.0.0.1:8000/UralIntern/";
pub const DEFAULT_SCHEDULER_URL: &str = "http://127.0.0.1:8000/scheduler/api/v1/";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ACCOUNTS_URL_ENV: &str = "INTERNBOARD_ACCOUNTS_URL";
const SCHEDULER_URL_ENV: &str = "INTERNBOARD_SCHEDULER_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the accounts API (login, refresh, teams, users)
    pub accounts_url: String,
    /// Base URL of the scheduler API (tasks, stages, comments)
    pub scheduler_url: String,
    pub request_timeout_secs: u64,
    pub last_username: Option<String>,
    pub timer_guard: GuardPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            scheduler_url: DEFAULT_SCHEDULER_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_username: None,
            timer_guard: GuardPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ACCOUNTS_URL_ENV) {
            self.accounts_url = url;
        }
        if let Ok(url) = std::env::var(SCHEDULER_URL_ENV) {
            self.scheduler_url = url;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
