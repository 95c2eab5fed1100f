//! # guide-core
//!
//! The guided prompt assembly pipeline, minus the subprocess and the terminal.
//!
//! This crate provides:
//! - Configuration loading (`GuideConfig`)
//! - Defensive extraction of the analysis JSON
//! - The analyze call and its degraded outcomes
//! - The question session controller
//! - Prompt assembly with a deterministic fallback

mod analyzer;
mod assembler;
mod config;
mod extractor;
mod instructions;
mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analyzer::{Analysis, analyze};
pub use assembler::{FALLBACK_HEADING, PromptAssembler, fallback_assembly};
pub use config::{
    BackendKind, CliConfig, ConfigError, DEFAULT_CONFIG_FILE, GuideConfig, PromptMode,
    SessionConfig, TimeoutConfig,
};
pub use extractor::{ExtractionError, extract_json};
pub use instructions::{ANALYZER_INSTRUCTIONS, ASSEMBLER_INSTRUCTIONS};
pub use session::{
    CANCEL_TOKENS, InputSource, QuestionView, SessionError, SessionResult, is_cancel_token,
    run_session,
};
