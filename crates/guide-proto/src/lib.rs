//! # guide-proto
//!
//! Shared types, error definitions, and traits for prompt-guide.
//!
//! This crate provides:
//! - The session data model (`DraftPrompt`, `Question`, `Answers`, ...)
//! - The invocation error taxonomy shared by every backend
//! - The `PromptBackend` trait that the pipeline calls through

mod backend;
mod error;
mod prompt;

pub use backend::PromptBackend;
pub use error::InvocationError;
pub use prompt::{
    AnalysisResult, Answer, Answers, AssembledPrompt, AssemblySource, DraftPrompt,
    EmptyDraftError, Question, SessionOutcome,
};
