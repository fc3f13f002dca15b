//! Application-level configuration loading, including the quiz timer defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/quizmaster.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZMASTER_CONFIG_PATH";
/// Question duration applied when the set-question command omits one.
const DEFAULT_QUESTION_SECS: u64 = 30;
/// Extension applied when the add-time command omits a delta.
const DEFAULT_EXTEND_SECS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_question_secs: u64,
    default_extend_secs: u64,
}

impl AppConfig {
    /// Load the application configuration from disk.
    ///
    /// A missing file is normal and falls back to the built-in defaults. A
    /// file that exists but fails to parse aborts startup: a typo must never
    /// silently change the timers mid-season.
    pub fn load() -> anyhow::Result<Self> {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let raw: RawConfig = serde_json::from_str(&contents)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                let config: Self = raw.into();
                info!(
                    path = %path.display(),
                    question_secs = config.default_question_secs,
                    extend_secs = config.default_extend_secs,
                    "loaded timer defaults from config"
                );
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Ok(Self::default())
            }
            Err(err) => {
                Err(err).with_context(|| format!("reading config file {}", path.display()))
            }
        }
    }

    /// Question duration in seconds when the set-question command omits one.
    pub fn default_question_secs(&self) -> u64 {
        self.default_question_secs
    }

    /// Seconds granted by the add-time command when it omits a delta.
    pub fn default_extend_secs(&self) -> u64 {
        self.default_extend_secs
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_question_secs: DEFAULT_QUESTION_SECS,
            default_extend_secs: DEFAULT_EXTEND_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_question_secs: Option<u64>,
    default_extend_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            default_question_secs: value
                .default_question_secs
                .unwrap_or(defaults.default_question_secs),
            default_extend_secs: value
                .default_extend_secs
                .unwrap_or(defaults.default_extend_secs),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
