//! Conversation context and transcript types.
//!
//! A session keeps two records: the *context* (the `ChatMessage` list sent
//! back to the model) and the *transcript* (human-facing `TranscriptEntry`
//! rows, one per observable event). Both persist as JSONL.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ENTRY_TYPE_MESSAGE: &str = "message";
pub const ENTRY_TYPE_TOOL_CALL: &str = "tool_call";
pub const ENTRY_TYPE_TOOL_RESULT: &str = "tool_result";
pub const ENTRY_TYPE_SESSION_CREATED: &str = "session_created";

/// Seconds since the Unix epoch.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One row of the human-facing transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEntry {
    pub id: String,
    pub timestamp: u64,
    pub from: String,
    pub to: String,
    pub content: String,
    pub entry_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl TranscriptEntry {
    pub fn builder() -> TranscriptEntryBuilder {
        TranscriptEntryBuilder::default()
    }
}

/// Builder for [`TranscriptEntry`]; fills in a fresh id and timestamp.
#[derive(Debug, Default)]
pub struct TranscriptEntryBuilder {
    from: String,
    to: String,
    content: String,
    entry_type: String,
    tool_call_id: Option<String>,
}

impl TranscriptEntryBuilder {
    pub fn from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn to(mut self, to: &str) -> Self {
        self.to = to.to_string();
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn entry_type(mut self, entry_type: &str) -> Self {
        self.entry_type = entry_type.to_string();
        self
    }

    pub fn tool_call_id(mut self, tool_call_id: &str) -> Self {
        self.tool_call_id = Some(tool_call_id.to_string());
        self
    }

    pub fn build(self) -> TranscriptEntry {
        TranscriptEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_timestamp(),
            from: self.from,
            to: self.to,
            content: self.content,
            entry_type: self.entry_type,
            tool_call_id: self.tool_call_id,
        }
    }
}

/// Message author role, serialized the way the chat-completion API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A finalized tool call as persisted in context and echoed back to the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl From<crate::llm::ToolCallAccumulator> for ToolCallRecord {
    fn from(acc: crate::llm::ToolCallAccumulator) -> Self {
        Self {
            id: acc.id,
            name: acc.name,
            arguments: acc.arguments,
        }
    }
}

/// One message of the model-facing conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_with_tool_calls(content: &str, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }

    /// Render into the JSON shape the chat-completion API expects. Tool
    /// calls carry the nested `function` object; plain messages stay flat.
    pub fn to_api_json(&self) -> serde_json::Value {
        let mut msg = serde_json::json!({
            "role": self.role,
            "content": self.content,
        });
        if !self.tool_calls.is_empty() {
            let calls: Vec<serde_json::Value> = self
                .tool_calls
                .iter()
                .map(|call| {
                    serde_json::json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        },
                    })
                })
                .collect();
            msg["tool_calls"] = serde_json::Value::Array(calls);
        }
        if let Some(id) = &self.tool_call_id {
            msg["tool_call_id"] = serde_json::Value::String(id.clone());
        }
        msg
    }
}

/// A named session's model-facing conversation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub name: String,
    pub messages: Vec<ChatMessage>,
}

/// Build the API message list from stored context.
///
/// `keep_last` trims to the most recent N messages, but never splits a tool
/// exchange: a window starting on a `tool` message widens until it includes
/// the assistant message that requested it.
pub fn prepare_context_messages(
    messages: &[ChatMessage],
    keep_last: Option<usize>,
) -> Vec<serde_json::Value> {
    let mut start = match keep_last {
        Some(keep) if keep < messages.len() => messages.len() - keep,
        _ => 0,
    };
    while start > 0 && messages[start].role == Role::Tool {
        start -= 1;
    }
    messages[start..].iter().map(ChatMessage::to_api_json).collect()
}
