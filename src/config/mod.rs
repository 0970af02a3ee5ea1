//! Configuration system (layered: code > env > config file).

pub mod settings;

pub use settings::{SessionSettings, SettingsFile};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// Credentials and session settings for a parley runtime.
#[derive(Clone, Default)]
pub struct ParleyConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    pub settings: SessionSettings,
}

impl fmt::Debug for ParleyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParleyConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("settings", &self.settings)
            .finish()
    }
}

/// On-disk layout of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub session: SettingsFile,
}

impl ParleyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.env`, the config file (`PARLEY_CONFIG` or the default location)
    /// and then environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let path = std::env::var("PARLEY_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(default_config_path);
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::new(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw)?;
        let mut config = Self {
            api_key: file.api_key,
            base_url: file.base_url,
            settings: SessionSettings::default(),
        };
        file.session.apply(&mut config.settings);
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }

        let settings = &mut self.settings;
        if let Some(ms) = parse_env(&lookup, "PARLEY_POLL_INTERVAL_MS")? {
            settings.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env(&lookup, "PARLEY_RETRY_BACKOFF_MS")? {
            settings.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(budget) = parse_env(&lookup, "PARLEY_RETRY_BUDGET")? {
            settings.retry_budget = budget;
        }
        if let Some(depth) = parse_env(&lookup, "PARLEY_MAX_DELEGATION_DEPTH")? {
            settings.max_delegation_depth = depth;
        }
        if let Some(model) = lookup("PARLEY_CLASSIFIER_MODEL") {
            settings.classifier_model = model;
        }
        if let Some(model) = lookup("PARLEY_SUMMARIZER_MODEL") {
            settings.summarizer_model = model;
        }
        if let Some(delete) = parse_env(&lookup, "PARLEY_DELETE_DISCARDED_CONTEXTS")? {
            settings.delete_discarded_contexts = delete;
        }
        Ok(())
    }

    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key);
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    pub fn set_base_url(&mut self, url: String) {
        self.base_url = Some(url);
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url.clone()
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ParleyError::Configuration(format!("{name} has an invalid value: {raw}"))),
    }
}

/// `~/.parley/config.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".parley").join("config.toml"))
}
