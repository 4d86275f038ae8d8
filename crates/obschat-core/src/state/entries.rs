//! Entry creation helpers for transcript entries.
//!
//! Pure constructors with no I/O; they build TranscriptEntry values with the
//! conventional from/to pairing for each event kind.

use crate::context::{
    ENTRY_TYPE_MESSAGE, ENTRY_TYPE_SESSION_CREATED, ENTRY_TYPE_TOOL_CALL, ENTRY_TYPE_TOOL_RESULT,
    TranscriptEntry,
};

/// Create a transcript entry for a user message.
pub fn create_user_message_entry(session: &str, content: &str, username: &str) -> TranscriptEntry {
    TranscriptEntry::builder()
        .from(username)
        .to(session)
        .content(content)
        .entry_type(ENTRY_TYPE_MESSAGE)
        .build()
}

/// Create a transcript entry for an assistant message.
pub fn create_assistant_message_entry(session: &str, content: &str) -> TranscriptEntry {
    TranscriptEntry::builder()
        .from(session)
        .to("user")
        .content(content)
        .entry_type(ENTRY_TYPE_MESSAGE)
        .build()
}

/// Create a transcript entry for a tool call.
pub fn create_tool_call_entry(
    session: &str,
    tool_name: &str,
    arguments: &str,
    tool_call_id: &str,
) -> TranscriptEntry {
    TranscriptEntry::builder()
        .from(session)
        .to(tool_name)
        .content(arguments)
        .entry_type(ENTRY_TYPE_TOOL_CALL)
        .tool_call_id(tool_call_id)
        .build()
}

/// Create a transcript entry for a tool result.
pub fn create_tool_result_entry(
    session: &str,
    tool_name: &str,
    result: &str,
    tool_call_id: &str,
) -> TranscriptEntry {
    TranscriptEntry::builder()
        .from(tool_name)
        .to(session)
        .content(result)
        .entry_type(ENTRY_TYPE_TOOL_RESULT)
        .tool_call_id(tool_call_id)
        .build()
}

/// Create a session_created anchor entry.
pub fn create_session_created_anchor(session: &str) -> TranscriptEntry {
    TranscriptEntry::builder()
        .from("system")
        .to(session)
        .content("Session created")
        .entry_type(ENTRY_TYPE_SESSION_CREATED)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_entries_pair_directions() {
        let call = create_tool_call_entry("night1", "plan_observation", "{}", "call_1");
        let result = create_tool_result_entry("night1", "plan_observation", "ok", "call_1");
        assert_eq!(call.from, result.to);
        assert_eq!(call.to, result.from);
        assert_eq!(call.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(result.entry_type, ENTRY_TYPE_TOOL_RESULT);
    }
}
