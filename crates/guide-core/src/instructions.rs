//! System instructions and user messages for the two external calls.

use guide_proto::{DraftPrompt, Question};

/// System instruction for the analyze call.
pub const ANALYZER_INSTRUCTIONS: &str = r#"You help people write better prompts for an agentic coding assistant that works in a terminal: it can read and edit files, run commands, and change a codebase.

You will be given a draft prompt that is about to be sent to that assistant. Find the few pieces of missing context that would most change how well the assistant does the task. Ask only about things that are unclear or absent in the draft.

Useful angles:
- expected behavior versus what actually happens
- which part of the codebase is involved
- constraints, or things that must not be touched
- what "done" looks like
- context the author knows but did not write down

Rules:
- Ask between 0 and 4 questions. Fewer is better when the draft is already clear; ask none if it is detailed enough.
- Every question must be specific to this draft.
- Each question should be answerable in one sentence.
- Do not ask what the assistant can discover on its own by looking at the project.
- Do not ask about details that would not change the outcome.

Reply with a single JSON object and nothing else:
{
  "task_summary": "one line describing the task as you understand it",
  "questions": [
    {
      "question": "the question for the user",
      "hint": "why the answer matters, in a few words",
      "example": "a plausible answer, to show the expected shape"
    }
  ]
}"#;

/// System instruction for the assemble call.
pub const ASSEMBLER_INSTRUCTIONS: &str = r"You merge a user's draft prompt with the answers they gave to follow-up questions, producing one clean prompt for an agentic coding assistant.

Rules:
- Keep the user's intent and wording at the center.
- Work the answers into the prompt naturally instead of listing them at the end.
- Stay concise. Add nothing the user did not say: no extra steps, no warnings, no structure they did not ask for.
- The result should read as if the user had written the complete prompt themselves.
- Reply with the final prompt text only, with no preamble or explanation.";

/// Builds the user message for the analyze call.
pub fn analyze_message(draft: &DraftPrompt) -> String {
    format!("Analyze this prompt:\n\n{draft}")
}

/// Builds the user message for the assemble call from the answered questions.
pub fn assemble_message(draft: &DraftPrompt, summary: &str, provided: &[(&Question, &str)]) -> String {
    let mut message = String::new();

    message.push_str("Original prompt:\n");
    message.push_str(draft.as_str());
    message.push_str("\n\n");

    if !summary.trim().is_empty() {
        message.push_str("Task summary:\n");
        message.push_str(summary.trim());
        message.push_str("\n\n");
    }

    message.push_str("Additional context:\n");
    let context: Vec<String> = provided
        .iter()
        .map(|(question, answer)| format!("Q: {}\nA: {}", question.prompt_text, answer))
        .collect();
    message.push_str(&context.join("\n\n"));

    message
}
