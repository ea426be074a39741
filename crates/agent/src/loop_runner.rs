//! The conversation turn loop.

use crate::completion::CompletionClient;
use clerk_core::error::{ProviderError, RetryExhausted, TranscriptError};
use clerk_core::message::{ContentBlock, ConversationId, Message, ToolCall};
use clerk_core::provider::FinishReason;
use clerk_core::tool::{parse_arguments, ToolArgs, ToolRegistry};
use clerk_core::{AgentProfile, TranscriptStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One incoming user message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: ConversationId,
    /// Client-supplied id of the user message
    pub message_id: String,
    pub content: Vec<ContentBlock>,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model produced a final answer.
    Answered(Message),

    /// Every round was spent on tool calls. `last` is the final assistant
    /// message, which still requests tools.
    RoundLimitReached { rounds: u32, last: Message },
}

/// Failures that abort a turn. Tool failures never end up here; they are
/// handed back to the model as the tool's result.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Completion service error: {0}")]
    Completion(#[from] RetryExhausted<ProviderError>),

    #[error("Persistence error: {0}")]
    Persistence(#[from] TranscriptError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TurnError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Completion(_) => "completion_service",
            TurnError::Persistence(_) => "persistence",
            TurnError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Drives one turn: seed, record the user message, then alternate
/// completions and tool execution until the model answers or the round
/// budget runs out.
///
/// Every message is persisted before the loop moves on, so the transcript
/// store is the durable record even if the process dies mid-turn. Nothing
/// is rolled back when a later step fails.
pub struct TurnRunner {
    completion: CompletionClient,
    tools: Arc<ToolRegistry>,
    transcript: Arc<dyn TranscriptStore>,
    agent: AgentProfile,
    max_rounds: u32,
}

impl TurnRunner {
    pub fn new(
        completion: CompletionClient,
        tools: Arc<ToolRegistry>,
        transcript: Arc<dyn TranscriptStore>,
        agent: AgentProfile,
    ) -> Self {
        Self {
            completion,
            tools,
            transcript,
            agent,
            max_rounds: 3,
        }
    }

    /// Set the completion round budget per turn. Zero behaves like one.
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    pub fn agent(&self) -> &AgentProfile {
        &self.agent
    }

    pub fn transcript(&self) -> &Arc<dyn TranscriptStore> {
        &self.transcript
    }

    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        if request.content.iter().all(|b| b.as_text().trim().is_empty()) {
            return Err(TurnError::InvalidRequest(
                "message content must contain text".into(),
            ));
        }

        let conversation_id = request.conversation_id;
        let mut messages = self.transcript.conversation(&conversation_id).await?;

        if messages.is_empty() {
            info!(conversation_id = %conversation_id, agent = %self.agent.name, "Starting new conversation");
            let system = Message::system(conversation_id.clone(), &self.agent.instructions);
            self.persist(&mut messages, system).await?;
        }

        let user = Message::user(conversation_id.clone(), request.message_id, request.content);
        info!(conversation_id = %conversation_id, "User: {}", user.text());
        self.persist(&mut messages, user).await?;

        let mut round = 0;
        loop {
            round += 1;
            debug!(conversation_id = %conversation_id, round, "Completion round");

            let completion = self.completion.complete(&messages).await.map_err(|e| {
                error!(conversation_id = %conversation_id, error = %e, "Completion failed, aborting turn");
                e
            })?;

            let finish_reason = completion.finish_reason;
            let reply = completion.message;
            let assistant = Message::assistant(conversation_id.clone(), reply.content, reply.tool_calls);
            info!(
                conversation_id = %conversation_id,
                finish_reason = %finish_reason,
                "Assistant: {}",
                assistant.text()
            );
            self.persist(&mut messages, assistant.clone()).await?;

            if finish_reason != FinishReason::ToolCalls {
                return Ok(TurnOutcome::Answered(assistant));
            }

            for call in assistant.tool_calls() {
                let tool_message = self.run_tool_call(&conversation_id, call).await;
                self.persist(&mut messages, tool_message).await?;
            }

            if round >= self.max_rounds {
                warn!(
                    conversation_id = %conversation_id,
                    rounds = round,
                    "Round limit reached without a final answer"
                );
                return Ok(TurnOutcome::RoundLimitReached {
                    rounds: round,
                    last: assistant,
                });
            }
        }
    }

    /// Execute one tool call and wrap the outcome as a tool message.
    ///
    /// Failures become an `{"error": ...}` response so the model can react.
    async fn run_tool_call(&self, conversation_id: &ConversationId, call: &ToolCall) -> Message {
        let arguments = match parse_arguments(call) {
            Ok(args) => Value::Object(args),
            Err(_) => Value::String(call.arguments.clone()),
        };

        let response = match self
            .tools
            .execute_tool_call(call, &self.agent.name, ToolArgs::new())
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                json!({ "error": e.to_string() })
            }
        };

        let content = json!({
            "tool_name": call.name,
            "arguments": arguments,
            "response": response,
        });

        Message::tool_result(conversation_id.clone(), &call.id, content.to_string())
    }

    async fn persist(&self, messages: &mut Vec<Message>, message: Message) -> Result<(), TurnError> {
        if let Err(e) = self.transcript.append(&message).await {
            error!(
                conversation_id = %message.conversation_id,
                role = %message.role(),
                error = %e,
                "Failed to persist message, aborting turn"
            );
            return Err(e.into());
        }
        messages.push(message);
        Ok(())
    }
}
