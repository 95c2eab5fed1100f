//! The guided run: analyze, ask, assemble, review.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use guide_core::{
    Analysis, GuideConfig, InputSource, PromptAssembler, SessionError, SessionResult, analyze,
    is_cancel_token, run_session,
};
use guide_proto::{AssemblySource, DraftPrompt, InvocationError, PromptBackend, SessionOutcome};
use thiserror::Error;
use tracing::debug;

use crate::display::{Presenter, StatusKind};

/// Settings for one run, taken from the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideOptions {
    pub analyze_timeout: Duration,
    pub assemble_timeout: Duration,
    pub max_questions: usize,
}

impl GuideOptions {
    pub fn from_config(config: &GuideConfig) -> Self {
        Self {
            analyze_timeout: config.analyze_timeout(),
            assemble_timeout: config.assemble_timeout(),
            max_questions: config.session.max_questions,
        }
    }
}

/// Conditions that end a run without an outcome.
#[derive(Debug, Error)]
pub enum GuideError {
    #[error(transparent)]
    CliNotFound(InvocationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),
}

/// Runs the whole guided flow for `draft`.
///
/// `input` is the human's line reader; `None` means nobody can answer, so
/// every question is skipped and nothing is reviewed.
pub async fn run_guide<W: Write>(
    draft: &DraftPrompt,
    backend: &dyn PromptBackend,
    presenter: &mut Presenter<W>,
    mut input: Option<&mut dyn BufRead>,
    options: &GuideOptions,
) -> Result<SessionOutcome, GuideError> {
    presenter.show_panel("Your prompt", draft.as_str());

    let spinner = presenter.start_spinner("Analyzing your prompt");
    let analysis = analyze(backend, draft, options.analyze_timeout).await;
    spinner.finish();

    match &analysis {
        Analysis::Failed(err) if err.is_not_found() => {
            return Err(GuideError::CliNotFound(err.clone()));
        }
        Analysis::Failed(err) => presenter.show_status(
            StatusKind::Warning,
            &format!("Could not analyze the prompt ({err}); continuing with your draft"),
        ),
        Analysis::Malformed(_) => presenter.show_status(
            StatusKind::Warning,
            "The analysis was not usable; continuing with your draft",
        ),
        Analysis::Parsed(_) => {}
    }
    let degraded = analysis.is_degraded();
    let mut result = analysis.into_result();

    if !result.task_summary.is_empty() {
        presenter.show_status(StatusKind::Info, &format!("Task: {}", result.task_summary));
    }
    let dropped = result.cap_questions(options.max_questions);
    if dropped > 0 {
        debug!(
            "Dropped {} question(s) beyond the limit of {}",
            dropped, options.max_questions
        );
    }

    let questions = &result.questions;
    if !questions.is_empty() && input.is_some() {
        let noun = if questions.len() == 1 {
            "question"
        } else {
            "questions"
        };
        presenter.show_status(
            StatusKind::Info,
            &format!(
                "{} quick {noun} (enter to skip, :q to cancel)",
                questions.len()
            ),
        );
    }

    let source = match input.as_deref_mut() {
        Some(reader) => InputSource::Interactive(reader),
        None => InputSource::NonInteractive,
    };
    let answers = match run_session(questions, source, presenter)? {
        SessionResult::Completed(answers) => answers,
        SessionResult::Cancelled => return Ok(SessionOutcome::Cancelled),
    };

    let assembler = PromptAssembler::new(backend, options.assemble_timeout);
    let assembled = if answers.is_all_skipped() {
        assembler
            .assemble(draft, &result.task_summary, questions, &answers)
            .await
    } else {
        let spinner = presenter.start_spinner("Building your prompt");
        let assembled = assembler
            .assemble(draft, &result.task_summary, questions, &answers)
            .await;
        spinner.finish();
        assembled
    };

    let needs_review = match assembled.source {
        AssemblySource::Assembler => true,
        AssemblySource::Fallback => {
            presenter.show_status(
                StatusKind::Warning,
                "Could not rewrite the prompt; your answers were appended to it instead",
            );
            true
        }
        AssemblySource::Unchanged => degraded,
    };

    match input {
        Some(reader) if needs_review => review(presenter, reader, assembled.text),
        _ => {
            if assembled.source == AssemblySource::Unchanged && !degraded {
                let reason = if questions.is_empty() {
                    "No follow-up questions"
                } else {
                    "No answers given"
                };
                presenter.show_status(
                    StatusKind::Dim,
                    &format!("{reason}; sending your prompt as written"),
                );
            }
            Ok(SessionOutcome::Sent(assembled.text))
        }
    }
}

/// Shows the final prompt and asks whether to send, edit or cancel it.
fn review<W: Write>(
    presenter: &mut Presenter<W>,
    input: &mut dyn BufRead,
    text: String,
) -> Result<SessionOutcome, GuideError> {
    presenter.show_panel("Final prompt", &text);

    loop {
        presenter.prompt("Send this prompt? [Y]es / [e]dit / [c]ancel:");
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(SessionOutcome::Cancelled);
        }

        let choice = line.trim().to_ascii_lowercase();
        match choice.as_str() {
            "" | "y" | "yes" => return Ok(SessionOutcome::Sent(text)),
            "e" | "edit" => return edit(presenter, input, text),
            "c" | "cancel" | "n" | "no" => return Ok(SessionOutcome::Cancelled),
            _ if is_cancel_token(&choice) => return Ok(SessionOutcome::Cancelled),
            _ => presenter.show_status(StatusKind::Warning, "Please answer yes, edit or cancel"),
        }
    }
}

/// Reads a replacement prompt until end of input.
fn edit<W: Write>(
    presenter: &mut Presenter<W>,
    input: &mut dyn BufRead,
    text: String,
) -> Result<SessionOutcome, GuideError> {
    presenter.show_status(
        StatusKind::Info,
        "Enter the new prompt, then press Ctrl-D on an empty line to finish:",
    );

    let mut edited = String::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        edited.push_str(&line);
    }

    let edited = edited.trim();
    if edited.is_empty() {
        presenter.show_status(StatusKind::Dim, "Empty edit; keeping the prompt above");
        return Ok(SessionOutcome::Sent(text));
    }
    Ok(SessionOutcome::EditedThenSent(edited.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RenderMode;
    use guide_core::testing::ScriptedBackend;
    use std::io::Cursor;

    const AUTH_ANALYSIS: &str = r#"Here is my analysis:
```json
{
  "task_summary": "Fix a bug in the authentication flow",
  "questions": [
    {"question": "What is the symptom?", "hint": "Helps locate the bug", "example": "login fails"},
    {"question": "Which environment is affected?"}
  ]
}
```"#;

    fn draft() -> DraftPrompt {
        DraftPrompt::new("fix the auth bug").unwrap()
    }

    fn options() -> GuideOptions {
        GuideOptions {
            analyze_timeout: Duration::from_secs(5),
            assemble_timeout: Duration::from_secs(5),
            max_questions: 4,
        }
    }

    fn presenter() -> Presenter<Vec<u8>> {
        Presenter::new(Vec::new(), RenderMode::Plain)
    }

    fn stderr_of(presenter: &Presenter<Vec<u8>>) -> String {
        String::from_utf8_lossy(presenter.get_ref()).into_owned()
    }

    async fn run_with(
        backend: &ScriptedBackend,
        presenter: &mut Presenter<Vec<u8>>,
        input: &str,
    ) -> SessionOutcome {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        run_guide(&draft(), backend, presenter, Some(&mut reader), &options())
            .await
            .unwrap()
    }

    fn timeout_error() -> InvocationError {
        InvocationError::Timeout {
            command: "claude".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn answered_question_is_assembled_and_sent() {
        let backend = ScriptedBackend::new(vec![
            Ok(AUTH_ANALYSIS.to_string()),
            Ok("Fix the auth bug: login fails after users change their email.".to_string()),
        ]);
        let mut presenter = presenter();

        let outcome = run_with(
            &backend,
            &mut presenter,
            "users can't log in after changing their email\n\n\n",
        )
        .await;

        assert_eq!(
            outcome,
            SessionOutcome::Sent(
                "Fix the auth bug: login fails after users change their email.".to_string()
            )
        );
        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].user.contains("fix the auth bug"));
        assert!(calls[1].user.contains("users can't log in after changing their email"));
        assert!(!calls[1].user.contains("Which environment is affected?"));

        let stderr = stderr_of(&presenter);
        assert!(stderr.contains("--- Your prompt ---"));
        assert!(stderr.contains("Task: Fix a bug in the authentication flow"));
        assert!(stderr.contains("2 quick questions (enter to skip, :q to cancel)"));
        assert!(stderr.contains("Question 1/2: What is the symptom?"));
        assert!(stderr.contains("  hint: Helps locate the bug"));
        assert!(stderr.contains("--- Final prompt ---"));
    }

    #[tokio::test]
    async fn cancel_token_stops_before_assembly() {
        let backend = ScriptedBackend::new(vec![Ok(AUTH_ANALYSIS.to_string())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "login fails\n:q\n").await;

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn analyze_timeout_lets_user_approve_draft() {
        let backend = ScriptedBackend::new(vec![Err(timeout_error())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "\n").await;

        assert_eq!(outcome, SessionOutcome::Sent("fix the auth bug".to_string()));
        assert_eq!(backend.calls().len(), 1);
        let stderr = stderr_of(&presenter);
        assert!(stderr.contains("warning: Could not analyze the prompt (claude timed out after 5s)"));
        assert!(stderr.contains("--- Final prompt ---\nfix the auth bug\n---"));
    }

    #[tokio::test]
    async fn malformed_analysis_reviews_draft() {
        let backend = ScriptedBackend::new(vec![Ok("I'd ask about the symptom.".to_string())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "yes\n").await;

        assert_eq!(outcome, SessionOutcome::Sent("fix the auth bug".to_string()));
        assert!(stderr_of(&presenter).contains("warning: The analysis was not usable"));
    }

    #[tokio::test]
    async fn assemble_failure_falls_back_to_appended_answers() {
        let backend = ScriptedBackend::new(vec![
            Ok(AUTH_ANALYSIS.to_string()),
            Err(InvocationError::NonZeroExit {
                command: "claude".to_string(),
                code: Some(1),
                stderr: "rate limited".to_string(),
            }),
        ]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "login fails\nstaging\ny\n").await;

        assert_eq!(
            outcome,
            SessionOutcome::Sent(
                "fix the auth bug\n\nAdditional context:\n- What is the symptom? login fails\n- Which environment is affected? staging"
                    .to_string()
            )
        );
        assert!(stderr_of(&presenter).contains("warning: Could not rewrite the prompt"));
    }

    #[tokio::test]
    async fn missing_cli_is_fatal() {
        let backend = ScriptedBackend::new(vec![Err(InvocationError::CliNotFound {
            command: "claude".to_string(),
            remediation: "Install it.".to_string(),
        })]);
        let mut presenter = presenter();
        let mut reader = Cursor::new(Vec::new());

        let result = run_guide(
            &draft(),
            &backend,
            &mut presenter,
            Some(&mut reader),
            &options(),
        )
        .await;

        assert!(matches!(result, Err(GuideError::CliNotFound(_))));
    }

    #[tokio::test]
    async fn non_interactive_run_skips_everything() {
        let backend = ScriptedBackend::new(vec![Ok(AUTH_ANALYSIS.to_string())]);
        let mut presenter = Presenter::silent(Vec::new());

        let outcome = run_guide(&draft(), &backend, &mut presenter, None, &options())
            .await
            .unwrap();

        assert_eq!(outcome, SessionOutcome::Sent("fix the auth bug".to_string()));
        assert_eq!(backend.calls().len(), 1);
        assert!(presenter.get_ref().is_empty());
    }

    #[tokio::test]
    async fn all_skipped_sends_draft_without_review() {
        let backend = ScriptedBackend::new(vec![Ok(AUTH_ANALYSIS.to_string())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "\n\n").await;

        assert_eq!(outcome, SessionOutcome::Sent("fix the auth bug".to_string()));
        assert_eq!(backend.calls().len(), 1);
        let stderr = stderr_of(&presenter);
        assert!(stderr.contains("No answers given; sending your prompt as written"));
        assert!(!stderr.contains("Final prompt"));
    }

    #[tokio::test]
    async fn no_questions_sends_draft_without_reading_input() {
        let backend = ScriptedBackend::new(vec![Ok(
            r#"{"task_summary": "Fix a bug", "questions": []}"#.to_string(),
        )]);
        let mut presenter = presenter();

        // Empty input would read as a cancel if the review step ran.
        let outcome = run_with(&backend, &mut presenter, "").await;

        assert_eq!(outcome, SessionOutcome::Sent("fix the auth bug".to_string()));
        assert!(stderr_of(&presenter).contains("No follow-up questions"));
    }

    #[tokio::test]
    async fn questions_are_capped() {
        let backend = ScriptedBackend::new(vec![Ok(AUTH_ANALYSIS.to_string())]);
        let mut presenter = presenter();
        let mut reader = Cursor::new(b"\n".to_vec());
        let options = GuideOptions {
            max_questions: 1,
            ..options()
        };

        run_guide(&draft(), &backend, &mut presenter, Some(&mut reader), &options)
            .await
            .unwrap();

        let stderr = stderr_of(&presenter);
        assert!(stderr.contains("1 quick question (enter to skip"));
        assert!(stderr.contains("Question 1/1: What is the symptom?"));
        assert!(!stderr.contains("Which environment is affected?"));
    }

    #[tokio::test]
    async fn edit_replaces_the_prompt() {
        let backend = ScriptedBackend::new(vec![Err(timeout_error())]);
        let mut presenter = presenter();

        let outcome = run_with(
            &backend,
            &mut presenter,
            "e\nfix the auth bug in login.rs\nonly on staging\n",
        )
        .await;

        assert_eq!(
            outcome,
            SessionOutcome::EditedThenSent("fix the auth bug in login.rs\nonly on staging".to_string())
        );
    }

    #[tokio::test]
    async fn empty_edit_keeps_the_prompt() {
        let backend = ScriptedBackend::new(vec![Err(timeout_error())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "edit\n  \n").await;

        assert_eq!(outcome, SessionOutcome::Sent("fix the auth bug".to_string()));
    }

    #[tokio::test]
    async fn review_reasks_on_unknown_choice_and_cancels_on_eof() {
        let backend = ScriptedBackend::new(vec![Err(timeout_error())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "maybe\n").await;

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(stderr_of(&presenter).contains("warning: Please answer yes, edit or cancel"));
    }

    #[tokio::test]
    async fn review_cancel_choice() {
        let backend = ScriptedBackend::new(vec![Err(timeout_error())]);
        let mut presenter = presenter();

        let outcome = run_with(&backend, &mut presenter, "c\n").await;

        assert_eq!(outcome, SessionOutcome::Cancelled);
    }
}
