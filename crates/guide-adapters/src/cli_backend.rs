//! How to call a particular AI CLI in non-interactive, plain-text mode.

use guide_core::{BackendKind, CliConfig, PromptMode};

const CLAUDE_INSTALL_HINT: &str =
    "Is Claude Code installed? See https://docs.anthropic.com/en/docs/claude-code";

/// A CLI program plus the argument conventions for one-shot text requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliBackend {
    /// Label used in messages and logs.
    pub name: String,
    /// Program name (looked up on PATH) or path.
    pub command: String,
    /// Arguments placed before the system instruction and message.
    pub args: Vec<String>,
    /// Flag that carries the system instruction. Without one, the
    /// instruction is prepended to the user message.
    pub system_flag: Option<String>,
    pub prompt_mode: PromptMode,
    /// Extra install locations checked when the program is not on PATH.
    /// A leading `~/` is expanded against `$HOME`.
    pub fallback_paths: Vec<String>,
    /// Shown to the user when the program cannot be found.
    pub install_hint: String,
}

/// Arguments and stdin payload for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CliBackend {
    /// Claude Code in print mode: `claude --print --output-format text`.
    ///
    /// The message goes through stdin to avoid argument length and quoting issues.
    pub fn claude() -> Self {
        Self {
            name: "claude".to_string(),
            command: "claude".to_string(),
            args: vec![
                "--print".to_string(),
                "--output-format".to_string(),
                "text".to_string(),
            ],
            system_flag: Some("--system-prompt".to_string()),
            prompt_mode: PromptMode::Stdin,
            fallback_paths: vec![
                "~/.claude/local/claude".to_string(),
                "/usr/local/bin/claude".to_string(),
            ],
            install_hint: CLAUDE_INSTALL_HINT.to_string(),
        }
    }

    /// Any command that reads a message and prints a reply.
    pub fn custom(command: impl Into<String>, args: Vec<String>) -> Self {
        let command = command.into();
        Self {
            name: command.clone(),
            install_hint: format!("Check that `{command}` is installed and on your PATH."),
            command,
            args,
            system_flag: None,
            prompt_mode: PromptMode::Stdin,
            fallback_paths: Vec::new(),
        }
    }

    /// Builds the backend described by the `cli` config section.
    pub fn from_config(config: &CliConfig) -> Self {
        match config.backend {
            BackendKind::Claude => {
                let mut backend = Self::claude();
                if let Some(command) = &config.command {
                    backend.command.clone_from(command);
                    backend.fallback_paths.clear();
                }
                backend
            }
            BackendKind::Custom => {
                let command = config.command.clone().unwrap_or_default();
                Self::custom(command, config.args.clone())
                    .with_system_flag(config.system_flag.clone())
                    .with_prompt_mode(config.prompt_mode)
            }
        }
    }

    pub fn with_system_flag(mut self, flag: Option<String>) -> Self {
        self.system_flag = flag;
        self
    }

    pub fn with_prompt_mode(mut self, mode: PromptMode) -> Self {
        self.prompt_mode = mode;
        self
    }

    /// Lays out one request according to this backend's conventions.
    pub fn build_invocation(&self, system_instruction: &str, user_message: &str) -> Invocation {
        let mut args = self.args.clone();

        let message = match &self.system_flag {
            Some(flag) if !system_instruction.is_empty() => {
                args.push(flag.clone());
                args.push(system_instruction.to_string());
                user_message.to_string()
            }
            _ if !system_instruction.is_empty() => {
                format!("{system_instruction}\n\n{user_message}")
            }
            _ => user_message.to_string(),
        };

        match self.prompt_mode {
            PromptMode::Stdin => Invocation {
                args,
                stdin: Some(message),
            },
            PromptMode::Arg => {
                args.push(message);
                Invocation { args, stdin: None }
            }
        }
    }
}
