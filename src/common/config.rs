//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Test runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Run log settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Runner timing settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Timeout applied to tests that do not set their own
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,

    /// Time between the polite termination request and the hard kill
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// How often a running test's output is drained into the run log
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            grace_period_secs: default_grace_period(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    300
}
fn default_grace_period() -> u64 {
    2
}
fn default_poll_interval() -> u64 {
    500
}

/// Run log configuration
#[derive(Debug, Deserialize, Default)]
pub struct LogConfig {
    /// Directory for generated run log names (default: current directory)
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.runner.default_timeout_secs == 0 {
            return Err(super::Error::Config(
                "runner.default_timeout_secs must be positive".to_string(),
            ));
        }
        if config.runner.poll_interval_ms == 0 {
            return Err(super::Error::Config(
                "runner.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    /// Timing settings handed to each test case
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            default_timeout: Duration::from_secs(self.runner.default_timeout_secs),
            grace_period: Duration::from_secs(self.runner.grace_period_secs),
            poll_interval: Duration::from_millis(self.runner.poll_interval_ms),
        }
    }
}

/// Immutable timing settings, copied into every test case at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub default_timeout: Duration,
    pub grace_period: Duration,
    pub poll_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Config::default().runner_settings()
    }
}

impl RunnerSettings {
    /// Override the timeout used by tests that don't specify one
    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout = Duration::from_secs(secs);
        self
    }
}
