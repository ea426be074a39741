//! The active agent's identity.

use serde::{Deserialize, Serialize};

/// Default system prompt of the order and product assistant.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant. You are here to help with \
orders data and products data. Try using the tools first before you use your own knowledge. \
IMPORTANT! If you can't find what you're looking for, try 2 more times, but with a different \
query, maybe with less keywords in the query, for example instead of 'BOYA BYM1 Microphone', \
your second search should be 'BOYA BYM1'.";

/// Who is answering: the name shows up in tool-call logs, the instructions
/// seed every new conversation as its system message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub instructions: String,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
        }
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self::new("Anderson", DEFAULT_INSTRUCTIONS)
    }
}
