//! The seam between the pipeline and whatever runs the model.

use std::time::Duration;

use async_trait::async_trait;

use crate::InvocationError;

/// Something that can answer a system instruction plus a user message with text.
///
/// The production implementation spawns the external AI CLI; tests use
/// in-memory fakes. Implementations must not retry on their own: callers
/// decide whether a failure means "fall back" or "give up".
#[async_trait]
pub trait PromptBackend: Send + Sync {
    /// Runs one request and returns the raw text response.
    async fn invoke(
        &self,
        system_instruction: &str,
        user_message: &str,
        timeout: Duration,
    ) -> Result<String, InvocationError>;
}
