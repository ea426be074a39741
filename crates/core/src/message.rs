//! Message and Conversation domain types.
//!
//! A conversation is the append-only sequence of messages sharing a
//! `ConversationId`. Each message is a role-tagged sum type so that fields
//! only valid for one role (tool calls, `tool_call_id`) cannot appear on
//! another.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier grouping messages into one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Agent instructions; always first in a conversation
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed segment of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call, echoed back on the tool message
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON-encoded object
    pub arguments: String,
}

/// Role-specific payload of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum MessageBody {
    System {
        content: Vec<ContentBlock>,
    },
    User {
        content: Vec<ContentBlock>,
    },
    Assistant {
        /// `None` when the model only requested tool calls
        content: Option<Vec<ContentBlock>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: Vec<ContentBlock>,
        tool_call_id: String,
    },
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub conversation_id: ConversationId,
    pub message_id: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    /// Create a system message carrying agent instructions.
    pub fn system(conversation_id: ConversationId, instructions: impl Into<String>) -> Self {
        Self {
            conversation_id,
            message_id: Uuid::new_v4().to_string(),
            body: MessageBody::System {
                content: vec![ContentBlock::text(instructions)],
            },
        }
    }

    /// Create a user message. The id is supplied by the client.
    pub fn user(
        conversation_id: ConversationId,
        message_id: impl Into<String>,
        content: Vec<ContentBlock>,
    ) -> Self {
        Self {
            conversation_id,
            message_id: message_id.into(),
            body: MessageBody::User { content },
        }
    }

    /// Create an assistant message from model output.
    ///
    /// Text becomes a single content block; absent text yields `content: None`.
    pub fn assistant(
        conversation_id: ConversationId,
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            conversation_id,
            message_id: Uuid::new_v4().to_string(),
            body: MessageBody::Assistant {
                content: text.map(|t| vec![ContentBlock::text(t)]),
                tool_calls,
            },
        }
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(
        conversation_id: ConversationId,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            message_id: Uuid::new_v4().to_string(),
            body: MessageBody::Tool {
                content: vec![ContentBlock::text(content)],
                tool_call_id: tool_call_id.into(),
            },
        }
    }

    pub fn role(&self) -> Role {
        match &self.body {
            MessageBody::System { .. } => Role::System,
            MessageBody::User { .. } => Role::User,
            MessageBody::Assistant { .. } => Role::Assistant,
            MessageBody::Tool { .. } => Role::Tool,
        }
    }

    /// Content blocks, or `None` for a pure tool-call assistant message.
    pub fn content(&self) -> Option<&[ContentBlock]> {
        match &self.body {
            MessageBody::System { content }
            | MessageBody::User { content }
            | MessageBody::Tool { content, .. } => Some(content),
            MessageBody::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// All text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content()
            .map(|blocks| {
                blocks
                    .iter()
                    .map(ContentBlock::as_text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.body {
            MessageBody::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Whether this message belongs in user-facing chat history:
    /// user messages and final (non tool-calling) assistant messages.
    pub fn is_visible_chat(&self) -> bool {
        match &self.body {
            MessageBody::User { .. } => true,
            MessageBody::Assistant { tool_calls, .. } => tool_calls.is_empty(),
            _ => false,
        }
    }
}
