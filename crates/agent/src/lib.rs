//! The conversation turn loop for Clerk.
//!
//! One turn follows a **persist → complete → execute tools** cycle:
//!
//! 1. **Seed** a new conversation with the agent's instructions
//! 2. **Record** the user message
//! 3. **Send** the whole transcript plus the tool schemas to the provider
//! 4. **If tool calls**: run each one, record its result, loop back to step 3
//! 5. **Otherwise**: the assistant message is the answer
//!
//! The loop stops after a fixed number of completion rounds even if the
//! model keeps asking for tools.

pub mod completion;
pub mod loop_runner;

#[cfg(test)]
mod test_helpers;

pub use completion::CompletionClient;
pub use loop_runner::{TurnError, TurnOutcome, TurnRequest, TurnRunner};

use clerk_config::AppConfig;
use clerk_core::{Provider, TranscriptStore};
use std::sync::Arc;

/// Wire a turn runner from configuration, with the data-service tools.
pub fn build_runner(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    transcript: Arc<dyn TranscriptStore>,
) -> TurnRunner {
    let tools = Arc::new(clerk_tools::default_registry(&config.data_service));
    let completion = CompletionClient::new(provider, &config.model, tools.definitions())
        .with_temperature(config.temperature)
        .with_retry(config.retry.policy());

    TurnRunner::new(completion, tools, transcript, config.agent.profile())
        .with_max_rounds(config.agent.max_rounds)
}
