//! Configuration loading for prompt-guide.
//!
//! Every field has a default, so an absent or partial `prompt-guide.yml`
//! is always valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "prompt-guide.yml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_QUESTIONS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    pub cli: CliConfig,
    pub timeouts: TimeoutConfig,
    pub session: SessionConfig,
}

/// Which external CLI to run and how to talk to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub backend: BackendKind,
    /// Program name or path; defaults to the preset's program.
    pub command: Option<String>,
    /// Arguments placed before the generated flags (custom backend only).
    pub args: Vec<String>,
    /// Flag carrying the system instruction (custom backend only).
    pub system_flag: Option<String>,
    pub prompt_mode: PromptMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Claude,
    Custom,
}

/// How the user message reaches the external CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Written to the child's stdin, then stdin is closed.
    #[default]
    Stdin,
    /// Appended as the last command-line argument.
    Arg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub analyze_secs: u64,
    pub assemble_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            analyze_secs: DEFAULT_TIMEOUT_SECS,
            assemble_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound on questions shown, whatever the analysis returns.
    pub max_questions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_questions: DEFAULT_MAX_QUESTIONS,
        }
    }
}

impl GuideConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration from a YAML string. An empty document yields defaults.
    pub fn parse_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Resolves the configuration for a run.
    ///
    /// An explicit path must exist. Without one, `prompt-guide.yml` in `cwd`
    /// is used when present, otherwise defaults. The result is normalized
    /// and validated.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    debug!("Loading config from {}", default_path.display());
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Replaces values that would make a run impossible with defaults.
    pub fn normalize(&mut self) {
        if self.timeouts.analyze_secs == 0 {
            self.timeouts.analyze_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.timeouts.assemble_secs == 0 {
            self.timeouts.assemble_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.session.max_questions == 0 {
            self.session.max_questions = 1;
        }
        if let Some(command) = &self.cli.command
            && command.trim().is_empty()
        {
            self.cli.command = None;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cli.backend == BackendKind::Custom && self.cli.command.is_none() {
            return Err(ConfigError::Invalid(
                "cli.command is required when cli.backend is custom".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies a `--timeout` override to both external calls.
    pub fn override_timeouts(&mut self, secs: u64) {
        if secs > 0 {
            self.timeouts.analyze_secs = secs;
            self.timeouts.assemble_secs = secs;
        }
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.analyze_secs)
    }

    pub fn assemble_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.assemble_secs)
    }
}
