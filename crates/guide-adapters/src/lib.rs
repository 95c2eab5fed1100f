//! # guide-adapters
//!
//! External AI CLI adapters for prompt-guide.
//!
//! This crate turns a configured backend into a [`guide_proto::PromptBackend`]
//! by running the CLI as a subprocess:
//! - Claude Code (`claude --print`), the default
//! - Custom commands described entirely by configuration
//!
//! ## Detection
//!
//! The `auto_detect` module resolves the backend's program once, before the
//! first call, so a missing CLI is reported up front with a remediation hint.

mod auto_detect;
mod cli_backend;
mod cli_executor;

pub use auto_detect::{NoBackendError, detect_backend};
pub use cli_backend::{CliBackend, Invocation};
pub use cli_executor::{CliExecutor, ExecutionResult};
pub use guide_core::PromptMode;
