//! Scripted stand-ins for the turn loop's collaborators.

use async_trait::async_trait;
use clerk_core::error::{ProviderError, ToolError, TranscriptError};
use clerk_core::message::{ConversationId, Message, ToolCall};
use clerk_core::provider::{
    AssistantReply, Completion, CompletionRequest, FinishReason, Provider, Usage,
};
use clerk_core::tool::{Tool, ToolArgs};
use clerk_core::TranscriptStore;
use clerk_transcript::InMemoryTranscriptStore;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A provider that replays scripted results, then repeats a fallback.
///
/// Every request is recorded for inspection.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    fallback: Option<Result<Completion, ProviderError>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Completion, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same completion.
    pub fn repeating(completion: Completion) -> Self {
        Self {
            fallback: Some(Ok(completion)),
            ..Self::new(vec![])
        }
    }

    /// Fail every request with the same error.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            fallback: Some(Err(error)),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(result) => result.clone(),
            None => panic!("ScriptedProvider: script exhausted"),
        }
    }
}

fn completion(finish_reason: FinishReason, content: Option<&str>, tool_calls: Vec<ToolCall>) -> Completion {
    Completion {
        finish_reason,
        message: AssistantReply {
            content: content.map(str::to_string),
            tool_calls,
        },
        model: "mock-model".into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// A final answer.
pub fn text_completion(text: &str) -> Completion {
    completion(FinishReason::Stop, Some(text), vec![])
}

/// A completion that only requests tool calls.
pub fn tool_call_completion(calls: Vec<ToolCall>) -> Completion {
    completion(FinishReason::ToolCalls, None, calls)
}

pub fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

/// Returns its arguments unchanged.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the arguments back"
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(serde_json::json!({"type": "object"}))
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        Ok(Value::Object(args))
    }
}

/// Counts its invocations and returns nothing useful.
#[derive(Default)]
pub struct CountingTool {
    calls: AtomicUsize,
}

impl CountingTool {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        "counter"
    }

    fn description(&self) -> &str {
        "Count invocations"
    }

    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, _args: ToolArgs) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    }
}

/// An in-memory store that starts failing after a number of appends,
/// or refuses every read.
pub struct FlakyStore {
    inner: InMemoryTranscriptStore,
    appends_left: AtomicUsize,
    reads_fail: bool,
}

impl FlakyStore {
    pub fn failing_after(appends: usize) -> Self {
        Self {
            inner: InMemoryTranscriptStore::new(),
            appends_left: AtomicUsize::new(appends),
            reads_fail: false,
        }
    }

    pub fn unreadable() -> Self {
        Self {
            reads_fail: true,
            ..Self::failing_after(usize::MAX)
        }
    }

    /// Messages that made it into the store, bypassing read failures.
    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }

    fn check_read(&self) -> Result<(), TranscriptError> {
        if self.reads_fail {
            return Err(TranscriptError::Storage("permission denied".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn append(&self, message: &Message) -> Result<(), TranscriptError> {
        let left = self.appends_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(TranscriptError::Storage("disk full".into()));
        }
        self.appends_left.store(left - 1, Ordering::SeqCst);
        self.inner.append(message).await
    }

    async fn conversation(&self, id: &ConversationId) -> Result<Vec<Message>, TranscriptError> {
        self.check_read()?;
        self.inner.conversation(id).await
    }

    async fn all(&self) -> Result<Vec<Message>, TranscriptError> {
        self.check_read()?;
        self.inner.all().await
    }
}
