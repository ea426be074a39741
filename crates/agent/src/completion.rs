//! Completion client: one provider call per round, under the retry policy.

use clerk_core::error::{ProviderError, RetryExhausted};
use clerk_core::message::Message;
use clerk_core::provider::{Completion, CompletionRequest, Provider, ToolDefinition};
use clerk_core::RetryPolicy;
use std::sync::Arc;
use tracing::debug;

/// Sends the transcript plus the static tool schemas to the provider.
///
/// Parallel tool calls are always requested; the turn loop still executes
/// them one at a time.
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: Option<f32>,
    tools: Vec<ToolDefinition>,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            tools,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Request one completion for `messages`.
    pub async fn complete(
        &self,
        messages: &[Message],
    ) -> Result<Completion, RetryExhausted<ProviderError>> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: self.tools.clone(),
            parallel_tool_calls: true,
            temperature: self.temperature,
        };

        let provider = &self.provider;
        let request = &request;
        let completion = self
            .retry
            .run("completion", move || async move {
                provider.complete(request.clone()).await
            })
            .await?;

        debug!(
            provider = provider.name(),
            model = %completion.model,
            finish_reason = %completion.finish_reason,
            tool_calls = completion.message.tool_calls.len(),
            "Completion received"
        );

        Ok(completion)
    }
}
