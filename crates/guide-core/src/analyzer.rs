//! The analyze call: draft in, summary and follow-up questions out.

use std::time::Duration;

use guide_proto::{AnalysisResult, DraftPrompt, InvocationError, PromptBackend};
use tracing::debug;

use crate::extractor::{ExtractionError, extract_json};
use crate::instructions::{ANALYZER_INSTRUCTIONS, analyze_message};

/// Result of the analyze call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    /// The response contained a usable analysis.
    Parsed(AnalysisResult),
    /// The call succeeded but no JSON object could be recovered.
    Malformed(ExtractionError),
    /// The call itself failed.
    Failed(InvocationError),
}

impl Analysis {
    /// True when the session has to continue without the model's questions.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Analysis::Parsed(_))
    }

    /// The analysis to drive the session with; empty when degraded.
    pub fn into_result(self) -> AnalysisResult {
        match self {
            Analysis::Parsed(result) => result,
            Analysis::Malformed(_) | Analysis::Failed(_) => AnalysisResult::empty(),
        }
    }
}

/// Sends the draft to the backend and parses the questions it suggests.
pub async fn analyze(
    backend: &dyn PromptBackend,
    draft: &DraftPrompt,
    timeout: Duration,
) -> Analysis {
    let response = match backend
        .invoke(ANALYZER_INSTRUCTIONS, &analyze_message(draft), timeout)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            debug!("Analyze call failed: {}", err);
            return Analysis::Failed(err);
        }
    };

    match extract_json(&response) {
        Ok(result) => {
            debug!(
                "Analysis parsed: {} question(s), summary {:?}",
                result.questions.len(),
                result.task_summary
            );
            Analysis::Parsed(result)
        }
        Err(err) => {
            debug!("Analysis response unusable ({}); raw response:\n{}", err, err.raw());
            Analysis::Malformed(err)
        }
    }
}
