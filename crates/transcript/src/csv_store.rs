//! CSV-backed transcript store.
//!
//! One row per message with the columns
//! `conversation_id,message_id,role,content,tool_calls,tool_call_id`.
//! `content` and `tool_calls` hold JSON text, or nothing when absent.
//! The file is append-only; reads rescan it from the top.

use async_trait::async_trait;
use clerk_core::error::TranscriptError;
use clerk_core::message::{ContentBlock, ConversationId, Message, MessageBody, Role, ToolCall};
use clerk_core::{RetryPolicy, TranscriptStore};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// A transcript kept in a single CSV file.
///
/// Appends are serialized through a mutex so rows never interleave. Each
/// row goes out in a single write and a failed write is truncated away, so
/// retrying an append under the store's retry policy cannot duplicate or
/// tear rows.
pub struct CsvTranscriptStore {
    path: PathBuf,
    retry: RetryPolicy,
    write_lock: Mutex<()>,
}

/// One CSV row. Field order is the column order.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    conversation_id: String,
    message_id: String,
    role: String,
    content: String,
    tool_calls: String,
    tool_call_id: String,
}

impl CsvTranscriptStore {
    /// Create a store at `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "CSV transcript store opened");
        Self {
            path,
            retry,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_once(&self, message: &Message) -> Result<(), TranscriptError> {
        let record = CsvRecord::from_message(message)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TranscriptError::Storage(format!("Failed to create transcript directory: {e}"))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TranscriptError::Storage(format!("Failed to open transcript file: {e}")))?;
        let start = file
            .metadata()
            .map_err(|e| TranscriptError::Storage(format!("Failed to stat transcript file: {e}")))?
            .len();

        let row = encode_row(&record, start == 0)?;
        write_row(&mut file, start, &row)
    }

    fn read_once(&self, filter: Option<&ConversationId>) -> Result<Vec<Message>, TranscriptError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|e| TranscriptError::Storage(format!("Failed to open transcript file: {e}")))?;

        let headers = reader
            .headers()
            .map_err(|e| TranscriptError::Storage(format!("Failed to read transcript header: {e}")))?
            .clone();

        let mut messages = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| TranscriptError::Corrupt {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                reason: e.to_string(),
            })?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let record: CsvRecord = row
                .deserialize(Some(&headers))
                .map_err(|e| TranscriptError::Corrupt {
                    line,
                    reason: e.to_string(),
                })?;

            if filter.is_some_and(|id| id.as_str() != record.conversation_id) {
                continue;
            }

            let message = record
                .into_message()
                .map_err(|reason| TranscriptError::Corrupt { line, reason })?;
            messages.push(message);
        }

        Ok(messages)
    }
}

/// Render one record, preceded by the header row when `with_header` is set.
fn encode_row(record: &CsvRecord, with_header: bool) -> Result<Vec<u8>, TranscriptError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    writer
        .serialize(record)
        .map_err(|e| TranscriptError::Storage(format!("Failed to encode transcript row: {e}")))?;
    writer
        .into_inner()
        .map_err(|e| TranscriptError::Storage(format!("Failed to encode transcript row: {e}")))
}

/// Something that can be cut back to a previous length.
trait Truncate {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write a whole row or nothing.
///
/// A failed write is cut back to `start` so a retried append never lands
/// after a torn row.
fn write_row<W: Write + Truncate>(out: &mut W, start: u64, row: &[u8]) -> Result<(), TranscriptError> {
    let Err(e) = out.write_all(row).and_then(|()| out.flush()) else {
        return Ok(());
    };

    match out.truncate_to(start) {
        Ok(()) => Err(TranscriptError::Storage(format!(
            "Failed to write transcript row: {e}"
        ))),
        Err(rollback) => Err(TranscriptError::Storage(format!(
            "Failed to write transcript row: {e}; rollback also failed: {rollback}"
        ))),
    }
}

impl CsvRecord {
    fn from_message(message: &Message) -> Result<Self, TranscriptError> {
        let content = match message.content() {
            Some(blocks) => serde_json::to_string(blocks)
                .map_err(|e| TranscriptError::Storage(format!("Failed to encode content: {e}")))?,
            None => String::new(),
        };

        let tool_calls = if message.tool_calls().is_empty() {
            String::new()
        } else {
            serde_json::to_string(message.tool_calls())
                .map_err(|e| TranscriptError::Storage(format!("Failed to encode tool calls: {e}")))?
        };

        Ok(Self {
            conversation_id: message.conversation_id.to_string(),
            message_id: message.message_id.clone(),
            role: message.role().to_string(),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id().unwrap_or_default().to_string(),
        })
    }

    fn into_message(self) -> Result<Message, String> {
        let role: Role = self.role.parse()?;

        let content: Option<Vec<ContentBlock>> = if self.content.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&self.content).map_err(|e| format!("bad content: {e}"))?)
        };

        let tool_calls: Vec<ToolCall> = if self.tool_calls.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.tool_calls).map_err(|e| format!("bad tool_calls: {e}"))?
        };

        let required = |content: Option<Vec<ContentBlock>>| {
            content.ok_or_else(|| format!("{role} message without content"))
        };

        let body = match role {
            Role::System => MessageBody::System {
                content: required(content)?,
            },
            Role::User => MessageBody::User {
                content: required(content)?,
            },
            Role::Assistant => MessageBody::Assistant { content, tool_calls },
            Role::Tool => {
                if self.tool_call_id.is_empty() {
                    return Err("tool message without tool_call_id".into());
                }
                MessageBody::Tool {
                    content: required(content)?,
                    tool_call_id: self.tool_call_id,
                }
            }
        };

        Ok(Message {
            conversation_id: ConversationId::from(self.conversation_id),
            message_id: self.message_id,
            body,
        })
    }
}

#[async_trait]
impl TranscriptStore for CsvTranscriptStore {
    fn name(&self) -> &str {
        "csv"
    }

    async fn append(&self, message: &Message) -> Result<(), TranscriptError> {
        let _guard = self.write_lock.lock().await;
        self.retry
            .run("transcript append", move || async move { self.append_once(message) })
            .await
            .map_err(|e| e.into_inner())?;
        debug!(
            conversation_id = %message.conversation_id,
            message_id = %message.message_id,
            role = %message.role(),
            "Message appended"
        );
        Ok(())
    }

    async fn conversation(&self, id: &ConversationId) -> Result<Vec<Message>, TranscriptError> {
        self.retry
            .run("transcript read", move || async move { self.read_once(Some(id)) })
            .await
            .map_err(|e| e.into_inner())
    }

    async fn all(&self) -> Result<Vec<Message>, TranscriptError> {
        self.retry
            .run("transcript read", move || async move { self.read_once(None) })
            .await
            .map_err(|e| e.into_inner())
    }
}
