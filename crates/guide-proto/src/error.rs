//! Error taxonomy for external model invocations.

use std::time::Duration;

use thiserror::Error;

/// Why a single call to the external AI CLI did not produce usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The CLI binary is not installed or not on PATH.
    #[error("{command} CLI not found. {remediation}")]
    CliNotFound {
        command: String,
        remediation: String,
    },

    /// The process did not finish in time and was killed.
    #[error("{command} timed out after {}s", .timeout.as_secs_f32())]
    Timeout { command: String, timeout: Duration },

    /// The process ran but reported failure.
    #[error("{command} exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The process succeeded but printed nothing usable.
    #[error("{command} returned an empty response")]
    EmptyOutput { command: String },

    /// The process could not be started for a reason other than "not found".
    #[error("could not run {command}: {message}")]
    Spawn { command: String, message: String },
}

impl InvocationError {
    /// True when the environment is missing the CLI entirely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, InvocationError::CliNotFound { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
