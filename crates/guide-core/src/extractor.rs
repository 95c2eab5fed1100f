//! Defensive extraction of the analysis JSON from free-form model output.
//!
//! The model is asked for a bare JSON object but frequently wraps it in a
//! markdown fence, adds a sentence before or after it, or gets a field
//! wrong. Field-level problems degrade to fewer questions; only a response
//! with no parsable object at all is an error.

use std::sync::LazyLock;

use guide_proto::{AnalysisResult, Question};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// A fence that opens the text: "```", "```json", "```JSON".
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A```[A-Za-z0-9_+-]*").expect("valid opening fence regex"));

/// A fence that closes the text.
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\z").expect("valid closing fence regex"));

const QUESTION_KEYS: &[&str] = &["question", "prompt_text", "prompt", "text"];
const HINT_KEYS: &[&str] = &["hint", "why", "rationale"];
const EXAMPLE_KEYS: &[&str] = &["example", "example_answer"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// No JSON object could be recovered. Carries the untouched response.
    #[error("analysis response is not usable JSON: {reason}")]
    Malformed { raw: String, reason: String },
}

impl ExtractionError {
    pub fn raw(&self) -> &str {
        match self {
            ExtractionError::Malformed { raw, .. } => raw,
        }
    }
}

/// Recovers an [`AnalysisResult`] from raw model output.
pub fn extract_json(raw: &str) -> Result<AnalysisResult, ExtractionError> {
    let malformed = |reason: String| ExtractionError::Malformed {
        raw: raw.to_string(),
        reason,
    };

    let candidate = strip_outer_fence(raw);

    let direct = if candidate.starts_with('{') {
        serde_json::from_str::<Value>(candidate).ok()
    } else {
        None
    };

    let value = match direct {
        Some(value) => value,
        None => {
            let span = object_span(candidate)
                .ok_or_else(|| malformed("no JSON object found".to_string()))?;
            serde_json::from_str::<Value>(span).map_err(|e| malformed(e.to_string()))?
        }
    };

    match value {
        Value::Object(fields) => Ok(coerce_analysis(&fields)),
        other => Err(malformed(format!("expected an object, found {}", kind_of(&other)))),
    }
}

/// Drops a fence that opens or closes the whole text. Fences anywhere
/// else, including inside JSON strings, are left alone; a fenced block
/// surrounded by prose is handled by the object span.
fn strip_outer_fence(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(opening) = OPENING_FENCE.find(text) {
        text = &text[opening.end()..];
    }
    if let Some(closing) = CLOSING_FENCE.find(text) {
        text = &text[..closing.start()];
    }
    text.trim()
}

/// The body of `text` when all of it is one fenced block.
///
/// Returns `None` for anything else, such as prose around a block or
/// several blocks, so those are kept verbatim.
pub(crate) fn unwrap_fenced_block(text: &str) -> Option<&str> {
    let (opening, rest) = text.trim().split_once('\n')?;
    let opening = opening.trim_end();
    if OPENING_FENCE.find(opening)?.end() != opening.len() {
        return None;
    }
    let body = rest.strip_suffix("```")?;
    if !(body.is_empty() || body.ends_with('\n')) {
        return None;
    }
    if body.lines().any(|line| line.trim_start().starts_with("```")) {
        return None;
    }
    Some(body.trim())
}

/// Slice from the first `{` to the last `}`, inclusive.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn coerce_analysis(fields: &Map<String, Value>) -> AnalysisResult {
    let task_summary = fields
        .get("task_summary")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let questions = fields
        .get("questions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_question).collect())
        .unwrap_or_default();

    AnalysisResult {
        task_summary,
        questions,
    }
}

fn coerce_question(item: &Value) -> Option<Question> {
    match item {
        Value::String(text) => non_blank(text).map(Question::new),
        Value::Object(fields) => {
            let prompt_text = first_string(fields, QUESTION_KEYS)?;
            Some(Question {
                prompt_text,
                hint: first_string(fields, HINT_KEYS),
                example: first_string(fields, EXAMPLE_KEYS),
            })
        }
        _ => None,
    }
}

fn first_string(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find_map(non_blank)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = r#"{
  "task_summary": "Fix a bug in the authentication system",
  "questions": [
    {"question": "What exactly fails?", "why": "Narrows the search", "example_answer": "Login returns 500"},
    {"question": "Which module handles sessions?"}
  ]
}"#;

    /// Built from a plain serde parse of `BARE`, not from the extractor.
    fn expected() -> AnalysisResult {
        let value: Value = serde_json::from_str(BARE).unwrap();
        let text = |v: &Value| v.as_str().unwrap().to_string();
        AnalysisResult {
            task_summary: text(&value["task_summary"]),
            questions: vec![
                Question::new(text(&value["questions"][0]["question"]))
                    .with_hint(text(&value["questions"][0]["why"]))
                    .with_example(text(&value["questions"][0]["example_answer"])),
                Question::new(text(&value["questions"][1]["question"])),
            ],
        }
    }

    #[test]
    fn parses_bare_object() {
        assert_eq!(extract_json(BARE).unwrap(), expected());
        let result = extract_json(BARE).unwrap();
        assert_eq!(result.task_summary, "Fix a bug in the authentication system");
        assert_eq!(result.questions.len(), 2);
        assert_eq!(result.questions[0].prompt_text, "What exactly fails?");
        assert_eq!(result.questions[0].hint.as_deref(), Some("Narrows the search"));
        assert_eq!(result.questions[0].example.as_deref(), Some("Login returns 500"));
        assert_eq!(result.questions[1].hint, None);
        assert_eq!(result.questions[1].example, None);
    }

    #[test]
    fn fenced_object_matches_bare() {
        let raw = format!("```json\n{BARE}\n```");
        assert_eq!(extract_json(&raw).unwrap(), expected());
    }

    #[test]
    fn fenced_object_with_prose_matches_bare() {
        let raw = format!(
            "Sure! Here is the analysis you asked for:\n\n```json\n{BARE}\n```\n\nLet me know if you need more."
        );
        assert_eq!(extract_json(&raw).unwrap(), expected());
    }

    #[test]
    fn unfenced_prose_matches_bare() {
        let raw = format!("Analysis follows. {BARE} Hope that helps.");
        assert_eq!(extract_json(&raw).unwrap(), expected());
    }

    #[test]
    fn inline_fence_matches_bare() {
        let compact: String = serde_json::to_string(&serde_json::from_str::<Value>(BARE).unwrap()).unwrap();
        let raw = format!("```json {compact} ```");
        assert_eq!(extract_json(&raw).unwrap(), expected());
    }

    #[test]
    fn uppercase_fence_and_trailing_prose_after_object() {
        let raw = format!("```JSON\n{BARE}\n```\nDone.");
        assert_eq!(extract_json(&raw).unwrap(), expected());
    }

    #[test]
    fn no_braces_is_malformed_with_raw_text() {
        let raw = "I think the prompt is fine as it is.";
        let err = extract_json(raw).unwrap_err();
        assert_eq!(err.raw(), raw);
        assert!(err.to_string().contains("no JSON object found"));
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(extract_json("").is_err());
        assert!(extract_json("```\n```").is_err());
    }

    #[test]
    fn reversed_braces_are_malformed() {
        assert!(extract_json("} nothing here {").is_err());
    }

    #[test]
    fn invalid_span_is_malformed() {
        let err = extract_json(r#"{"task_summary": "x", "questions": [}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }

    #[test]
    fn missing_summary_is_empty_not_error() {
        let result = extract_json(r#"{"questions": [{"question": "Which env?"}]}"#).unwrap();
        assert_eq!(result.task_summary, "");
        assert_eq!(result.questions.len(), 1);
    }

    #[test]
    fn non_string_summary_is_empty() {
        let result = extract_json(r#"{"task_summary": 42, "questions": []}"#).unwrap();
        assert_eq!(result.task_summary, "");
    }

    #[test]
    fn missing_questions_is_empty_not_error() {
        let result = extract_json(r#"{"task_summary": "Add caching"}"#).unwrap();
        assert_eq!(result.task_summary, "Add caching");
        assert!(result.questions.is_empty());
    }

    #[test]
    fn non_sequence_questions_is_empty() {
        let result = extract_json(r#"{"task_summary": "x", "questions": "none"}"#).unwrap();
        assert!(result.questions.is_empty());
    }

    #[test]
    fn field_aliases_are_accepted() {
        let result = extract_json(
            r#"{"questions": [
                {"prompt_text": "Which API?", "rationale": "scope", "example": "v2"},
                "Is there a deadline?",
                {"text": "Any tests?", "why": "  "}
            ]}"#,
        )
        .unwrap();
        assert_eq!(result.questions.len(), 3);
        assert_eq!(result.questions[0].prompt_text, "Which API?");
        assert_eq!(result.questions[0].hint.as_deref(), Some("scope"));
        assert_eq!(result.questions[0].example.as_deref(), Some("v2"));
        assert_eq!(result.questions[1].prompt_text, "Is there a deadline?");
        assert_eq!(result.questions[2].hint, None);
    }

    #[test]
    fn entries_without_question_text_are_dropped() {
        let result = extract_json(
            r#"{"questions": [{"why": "orphan"}, 7, null, "", {"question": "Kept?"}]}"#,
        )
        .unwrap();
        assert_eq!(result.questions, vec![Question::new("Kept?")]);
    }

    #[test]
    fn zero_questions_is_valid() {
        let result = extract_json(r#"{"task_summary": "Clear already", "questions": []}"#).unwrap();
        assert!(result.questions.is_empty());
    }

    const WITH_FENCES: &str = r#"{"task_summary": "Wrap output in ```json blocks", "questions": [{"question": "Should replies use ``` fences?"}]}"#;

    fn with_fences_expected() -> AnalysisResult {
        let value: Value = serde_json::from_str(WITH_FENCES).unwrap();
        AnalysisResult {
            task_summary: value["task_summary"].as_str().unwrap().to_string(),
            questions: vec![Question::new(
                value["questions"][0]["question"].as_str().unwrap(),
            )],
        }
    }

    #[test]
    fn fences_inside_strings_survive() {
        let expected = with_fences_expected();
        assert_eq!(expected.task_summary, "Wrap output in ```json blocks");

        assert_eq!(extract_json(WITH_FENCES).unwrap(), expected);
        assert_eq!(
            extract_json(&format!("```json\n{WITH_FENCES}\n```")).unwrap(),
            expected
        );
        assert_eq!(
            extract_json(&format!("Here you go:\n```json\n{WITH_FENCES}\n```\nThanks.")).unwrap(),
            expected
        );
    }

    #[test]
    fn unwrap_fenced_block_takes_a_lone_block() {
        assert_eq!(unwrap_fenced_block("```\nhello\n```"), Some("hello"));
        assert_eq!(unwrap_fenced_block("  ```text\nhello\nworld\n```\n"), Some("hello\nworld"));
        assert_eq!(unwrap_fenced_block("```\n```"), Some(""));
    }

    #[test]
    fn unwrap_fenced_block_leaves_other_text() {
        assert_eq!(unwrap_fenced_block("no fences"), None);
        assert_eq!(unwrap_fenced_block("Fix this:\n```rust\nfn main() {}\n```"), None);
        assert_eq!(unwrap_fenced_block("```\na\n```\nthen\n```\nb\n```"), None);
        assert_eq!(unwrap_fenced_block("```json {\"a\": 1} ```"), None);
    }
}
