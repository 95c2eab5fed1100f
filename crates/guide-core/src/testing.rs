//! In-memory backend for exercising the pipeline without a subprocess.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use guide_proto::{InvocationError, PromptBackend};

/// One recorded call to [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub timeout: Duration,
}

/// A backend that replays queued responses in order and records every call.
///
/// Once the queue is exhausted every further call fails with `EmptyOutput`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, InvocationError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<String, InvocationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PromptBackend for ScriptedBackend {
    async fn invoke(
        &self,
        system_instruction: &str,
        user_message: &str,
        timeout: Duration,
    ) -> Result<String, InvocationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system: system_instruction.to_string(),
                user: user_message.to_string(),
                timeout,
            });
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(InvocationError::EmptyOutput {
                    command: "scripted".to_string(),
                })
            })
    }
}
