//! Runs a backend's CLI once and returns its text output.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use guide_proto::{InvocationError, PromptBackend};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{CliBackend, detect_backend};

const STDERR_SNIPPET_CHARS: usize = 500;

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Trimmed stdout. Never empty.
    pub output: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Executes one request per call against a resolved CLI program.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    backend: CliBackend,
    program: PathBuf,
}

impl CliExecutor {
    /// Uses `program` as the already-resolved executable for `backend`.
    pub fn new(backend: CliBackend, program: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            program: program.into(),
        }
    }

    /// Resolves the backend's program, failing with `CliNotFound` if it is missing.
    pub fn detect(backend: CliBackend) -> Result<Self, InvocationError> {
        let program = detect_backend(&backend)?;
        Ok(Self::new(backend, program))
    }

    pub fn backend(&self) -> &CliBackend {
        &self.backend
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Spawns the CLI, feeds it the request, and waits up to `timeout`.
    ///
    /// The child is killed if the timeout elapses. No retries.
    pub async fn execute(
        &self,
        system_instruction: &str,
        user_message: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, InvocationError> {
        let invocation = self
            .backend
            .build_invocation(system_instruction, user_message);
        let name = self.backend.name.clone();

        let mut cmd = Command::new(&self.program);
        cmd.args(&invocation.args)
            .kill_on_drop(true)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            "Running {} ({}) with timeout {:?}",
            name,
            self.program.display(),
            timeout
        );
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|err| self.map_spawn_err(err))?;

        let stdin = child.stdin.take();
        let payload = invocation.stdin;
        let feed = async move {
            if let (Some(mut pipe), Some(payload)) = (stdin, payload) {
                // A child that exits without reading its input is not an error here.
                if let Err(err) = pipe.write_all(payload.as_bytes()).await
                    && err.kind() != std::io::ErrorKind::BrokenPipe
                {
                    return Err(err);
                }
            }
            Ok(())
        };
        // Output is drained while input is still being written, so a child
        // that echoes as it reads cannot fill both pipes.
        let run = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(InvocationError::Spawn {
                    command: name,
                    message: err.to_string(),
                });
            }
            Err(_) => {
                warn!("{} did not finish within {:?}; killed", name, timeout);
                return Err(InvocationError::Timeout {
                    command: name,
                    timeout,
                });
            }
        };
        let elapsed = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!(
            "{} exited with {} after {:?} ({} bytes of output)",
            name,
            output.status,
            elapsed,
            stdout.len()
        );

        if !output.status.success() {
            return Err(InvocationError::NonZeroExit {
                command: name,
                code: output.status.code(),
                stderr: truncate_snippet(&stderr, STDERR_SNIPPET_CHARS),
            });
        }

        if stdout.is_empty() {
            return Err(InvocationError::EmptyOutput { command: name });
        }

        Ok(ExecutionResult {
            output: stdout,
            stderr,
            elapsed,
        })
    }

    fn map_spawn_err(&self, err: std::io::Error) -> InvocationError {
        if err.kind() == std::io::ErrorKind::NotFound {
            InvocationError::CliNotFound {
                command: self.backend.name.clone(),
                remediation: self.backend.install_hint.clone(),
            }
        } else {
            InvocationError::Spawn {
                command: self.backend.name.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl PromptBackend for CliExecutor {
    async fn invoke(
        &self,
        system_instruction: &str,
        user_message: &str,
        timeout: Duration,
    ) -> Result<String, InvocationError> {
        self.execute(system_instruction, user_message, timeout)
            .await
            .map(|result| result.output)
    }
}

fn truncate_snippet(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &input[..cut]),
        None => input.to_string(),
    }
}
