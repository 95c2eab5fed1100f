//! The question session: one question at a time, answer or skip, or cancel.

use std::io::{self, BufRead};

use guide_proto::{Answer, Answers, Question};
use thiserror::Error;
use tracing::debug;

/// Inputs that abort the session. Compared case-insensitively after trimming.
pub const CANCEL_TOKENS: &[&str] = &[":q", ":quit", ":cancel"];

/// Renders a question on the interactive channel, right before input is read.
pub trait QuestionView {
    /// `number` is 1-based; `total` is the number of questions in the session.
    fn ask_question(&mut self, number: usize, total: usize, question: &Question);
}

/// Where answers come from.
pub enum InputSource<'a> {
    /// A line reader attached to a human.
    Interactive(&'a mut dyn BufRead),
    /// Nobody is there to answer; every question is skipped.
    NonInteractive,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Completed(Answers),
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read answer: {0}")]
    Input(#[from] io::Error),
}

/// True when `line` is one of the reserved cancellation inputs.
pub fn is_cancel_token(line: &str) -> bool {
    let trimmed = line.trim();
    CANCEL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Asks each question in order and collects the answers.
///
/// Blank input skips a question. End of input skips the current question
/// and all remaining ones. A cancel token ends the session immediately and
/// discards everything collected so far.
pub fn run_session(
    questions: &[Question],
    input: InputSource<'_>,
    view: &mut dyn QuestionView,
) -> Result<SessionResult, SessionError> {
    let total = questions.len();
    if total == 0 {
        return Ok(SessionResult::Completed(Answers::default()));
    }

    let reader = match input {
        InputSource::Interactive(reader) => reader,
        InputSource::NonInteractive => {
            debug!("Non-interactive session: skipping {} question(s)", total);
            return Ok(SessionResult::Completed(Answers::all_skipped(total)));
        }
    };

    let mut answers = Vec::with_capacity(total);
    for (index, question) in questions.iter().enumerate() {
        view.ask_question(index + 1, total, question);

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            debug!("Input closed at question {}; skipping the rest", index + 1);
            answers.resize(total, Answer::Skipped);
            break;
        }

        if is_cancel_token(&line) {
            debug!("Session cancelled at question {}", index + 1);
            return Ok(SessionResult::Cancelled);
        }

        answers.push(Answer::from_input(&line));
    }

    Ok(SessionResult::Completed(Answers::new(answers)))
}
