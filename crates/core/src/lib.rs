//! # Clerk Core
//!
//! Domain types, traits, and error definitions for the Clerk agent gateway.
//! This crate has **no framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion service, transcript storage,
//! tools) is a trait here. Implementations live in their respective crates,
//! so the turn loop can be tested against scripted stand-ins.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod retry;
pub mod tool;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use agent::AgentProfile;
pub use error::{Error, ProviderError, Result, RetryExhausted, ToolError, TranscriptError};
pub use message::{ContentBlock, ConversationId, Message, MessageBody, Role, ToolCall};
pub use provider::{AssistantReply, Completion, CompletionRequest, FinishReason, Provider, ToolDefinition};
pub use retry::RetryPolicy;
pub use tool::{Tool, ToolArgs, ToolRegistry};
pub use transcript::TranscriptStore;
