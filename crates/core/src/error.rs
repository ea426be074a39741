//! Error types for the Clerk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` ties together the
//! ones that surface from process-level entry points.

use thiserror::Error;

/// The top-level error type for Clerk entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the LLM completion service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed completion: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures resolving or running a model-issued tool call.
///
/// The turn loop never propagates these; it hands them back to the model
/// as the tool's result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Malformed arguments for tool '{tool_name}': {reason}")]
    MalformedArguments { tool_name: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Failures reading or appending to the transcript store.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt transcript record at line {line}: {reason}")]
    Corrupt { line: u64, reason: String },
}

/// An operation kept failing until its retry budget ran out.
///
/// Carries the error from the final attempt as its source.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct RetryExhausted<E: std::error::Error + 'static> {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

impl<E: std::error::Error + 'static> RetryExhausted<E> {
    /// Unwrap the error raised by the last attempt.
    pub fn into_inner(self) -> E {
        self.source
    }
}
