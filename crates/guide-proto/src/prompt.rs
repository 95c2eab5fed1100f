//! Session data model: the draft, the analysis, the answers, and the result.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a draft prompt is empty after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no prompt provided")]
pub struct EmptyDraftError;

/// The user's original prompt. Trimmed once at capture, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPrompt(String);

impl DraftPrompt {
    /// Captures a draft, rejecting input that is blank.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, EmptyDraftError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EmptyDraftError);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single follow-up question. Identity is its position in the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Question {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            hint: None,
            example: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

/// Output of the analyze call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub task_summary: String,
    pub questions: Vec<Question>,
}

impl AnalysisResult {
    /// An analysis with no summary and no questions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keeps at most `max` questions, returning how many were dropped.
    pub fn cap_questions(&mut self, max: usize) -> usize {
        let dropped = self.questions.len().saturating_sub(max);
        self.questions.truncate(max);
        dropped
    }
}

/// The user's reply to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Provided(String),
    Skipped,
}

impl Answer {
    /// Interprets one line of input: blank means skip.
    pub fn from_input(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Answer::Skipped
        } else {
            Answer::Provided(trimmed.to_string())
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Answer::Skipped)
    }
}

/// Answers collected during a session, positionally aligned with the questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers(Vec<Answer>);

impl Answers {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self(answers)
    }

    /// One skip per question.
    pub fn all_skipped(count: usize) -> Self {
        Self(vec![Answer::Skipped; count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when no question received a real answer.
    pub fn is_all_skipped(&self) -> bool {
        self.0.iter().all(Answer::is_skipped)
    }

    /// Pairs every non-skipped answer with its question, in question order.
    ///
    /// Answers beyond the end of `questions` are never yielded.
    pub fn provided<'a>(&'a self, questions: &'a [Question]) -> Vec<(&'a Question, &'a str)> {
        questions
            .iter()
            .zip(&self.0)
            .filter_map(|(question, answer)| match answer {
                Answer::Provided(text) => Some((question, text.as_str())),
                Answer::Skipped => None,
            })
            .collect()
    }
}

/// Where the final prompt text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblySource {
    /// The assemble call returned it.
    Assembler,
    /// The assemble call failed; the deterministic template produced it.
    Fallback,
    /// Nothing was answered, so the draft is returned as-is.
    Unchanged,
}

/// The single artifact written to the machine-output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub source: AssemblySource,
}

impl AssembledPrompt {
    pub fn unchanged(draft: &DraftPrompt) -> Self {
        Self {
            text: draft.as_str().to_string(),
            source: AssemblySource::Unchanged,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user approved the prompt as shown.
    Sent(String),
    /// The user rewrote the prompt before approving it.
    EditedThenSent(String),
    /// The user aborted. Nothing may be emitted.
    Cancelled,
}

impl SessionOutcome {
    /// The text to emit on stdout, if any.
    pub fn emitted(&self) -> Option<&str> {
        match self {
            SessionOutcome::Sent(text) | SessionOutcome::EditedThenSent(text) => Some(text),
            SessionOutcome::Cancelled => None,
        }
    }
}
