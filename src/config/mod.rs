//! Configuration (layered: defaults < TOML file < environment).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SkillError;
use crate::types::SessionSettings;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_ACTION_ROUND_TRIPS: usize = 8;

const CONFIG_FILE_NAME: &str = "skill-runner.toml";

/// Environment variables, highest precedence first.
const API_KEY_VARS: [&str; 2] = ["SKILL_RUNNER_API_KEY", "OPENAI_API_KEY"];
const BASE_URL_VARS: [&str; 2] = ["SKILL_RUNNER_BASE_URL", "OPENAI_BASE_URL"];
const MODEL_VARS: [&str; 2] = ["SKILL_RUNNER_MODEL", "OPENAI_MODEL"];
const ACTION_TIMEOUT_VAR: &str = "SKILL_RUNNER_ACTION_TIMEOUT_MS";
const INTERPRETER_VAR: &str = "SKILL_RUNNER_INTERPRETER";

/// Resolved model-service connection: where to connect, with what, to which model.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("base_url", &self.base_url)
            .field("api_key", &"..")
            .field("model", &self.model)
            .finish()
    }
}

/// How directive actions are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    /// Script path relative to the skill directory.
    pub script: PathBuf,
    /// Program that runs the script.
    pub interpreter: String,
    pub timeout_ms: u64,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            script: PathBuf::from("scripts").join("main.py"),
            interpreter: "python3".to_string(),
            timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }
}

impl ActionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level runner configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Upper bound on action round-trips inside one caller turn.
    pub max_action_round_trips: usize,
    pub action: ActionSettings,
    pub session: SessionSettings,
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("model", &self.model)
            .field("max_action_round_trips", &self.max_action_round_trips)
            .field("action", &self.action)
            .field("session", &self.session)
            .finish()
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            max_action_round_trips: DEFAULT_MAX_ACTION_ROUND_TRIPS,
            action: ActionSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the first config file found, then apply the environment.
    ///
    /// Files checked: `./skill-runner.toml`, then the platform config dir.
    /// A missing file is not an error; a malformed one is.
    pub fn load() -> Result<Self, SkillError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let base = match default_config_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        Ok(base.with_env())
    }

    /// Defaults overlaid with the environment only.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::default().with_env()
    }

    pub fn from_file(path: &Path) -> Result<Self, SkillError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            SkillError::Configuration(msg) => {
                SkillError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SkillError> {
        toml::from_str(raw).map_err(|e| SkillError::Configuration(e.to_string()))
    }

    /// Overlay values from process environment variables.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .find(|value| !value.is_empty())
        };

        if let Some(key) = first(&API_KEY_VARS[..]) {
            self.api_key = Some(key);
        }
        if let Some(url) = first(&BASE_URL_VARS[..]) {
            self.base_url = Some(url);
        }
        if let Some(model) = first(&MODEL_VARS[..]) {
            self.model = Some(model);
        }
        if let Some(interpreter) = first(&[INTERPRETER_VAR][..]) {
            self.action.interpreter = interpreter;
        }
        if let Some(raw) = first(&[ACTION_TIMEOUT_VAR][..]) {
            match raw.parse() {
                Ok(ms) => self.action.timeout_ms = ms,
                Err(_) => tracing::warn!(
                    var = ACTION_TIMEOUT_VAR,
                    value = %raw,
                    "ignoring non-numeric action timeout"
                ),
            }
        }
        self
    }

    /// Resolve the connection descriptor, filling defaults for URL and model.
    pub fn connection(&self) -> Result<ConnectionDescriptor, SkillError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            SkillError::Authentication(
                "Missing API key. Set SKILL_RUNNER_API_KEY or OPENAI_API_KEY".into(),
            )
        })?;
        Ok(ConnectionDescriptor {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "skill-runner") {
        paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    paths
}
