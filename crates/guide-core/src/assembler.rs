//! Prompt assembly: the assemble call, with a deterministic fallback.

use std::time::Duration;

use guide_proto::{
    Answers, AssembledPrompt, AssemblySource, DraftPrompt, PromptBackend, Question,
};
use tracing::debug;

use crate::extractor::unwrap_fenced_block;
use crate::instructions::{ASSEMBLER_INSTRUCTIONS, assemble_message};

/// Heading placed between the draft and the appended answers in the fallback.
pub const FALLBACK_HEADING: &str = "Additional context:";

/// Combines the draft with the user's answers.
pub struct PromptAssembler<'a> {
    backend: &'a dyn PromptBackend,
    timeout: Duration,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(backend: &'a dyn PromptBackend, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Produces the final prompt. Never fails.
    ///
    /// With no provided answers the draft is returned untouched and no call
    /// is made. If the assemble call fails or comes back empty, the answers
    /// are appended to the draft with [`fallback_assembly`].
    pub async fn assemble(
        &self,
        draft: &DraftPrompt,
        summary: &str,
        questions: &[Question],
        answers: &Answers,
    ) -> AssembledPrompt {
        let provided = answers.provided(questions);
        if provided.is_empty() {
            return AssembledPrompt::unchanged(draft);
        }

        let message = assemble_message(draft, summary, &provided);
        match self
            .backend
            .invoke(ASSEMBLER_INSTRUCTIONS, &message, self.timeout)
            .await
        {
            Ok(response) => {
                let text = unwrap_fenced_block(&response)
                    .unwrap_or(&response)
                    .trim()
                    .to_string();
                if text.is_empty() {
                    debug!("Assemble call returned only whitespace; using fallback");
                } else {
                    return AssembledPrompt {
                        text,
                        source: AssemblySource::Assembler,
                    };
                }
            }
            Err(err) => debug!("Assemble call failed ({}); using fallback", err),
        }

        AssembledPrompt {
            text: fallback_assembly(draft, &provided),
            source: AssemblySource::Fallback,
        }
    }
}

/// Appends each answered question to the draft, in question order.
///
/// The draft is always an unmodified prefix of the result, and the result
/// equals the draft when nothing was answered.
pub fn fallback_assembly(draft: &DraftPrompt, provided: &[(&Question, &str)]) -> String {
    let mut text = draft.as_str().to_string();
    if provided.is_empty() {
        return text;
    }

    text.push_str("\n\n");
    text.push_str(FALLBACK_HEADING);
    for (question, answer) in provided {
        text.push_str(&format!("\n- {} {}", question.prompt_text, answer));
    }
    text
}
