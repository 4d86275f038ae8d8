//! Debug logging for API requests and responses.
//!
//! When enabled, API interactions append to JSONL files inside the session's
//! directory. Logging failures are swallowed; debugging aids never break a
//! running prompt.

use crate::context::now_timestamp;
use crate::jsonl::append_jsonl_entry;
use crate::state::{AppState, StatePaths};
use serde_json::json;
use strum::{Display, EnumString};

/// Debug feature keys, selectable via the CLI `--debug` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DebugKey {
    /// Log outgoing request bodies to requests.jsonl.
    RequestLog,
    /// Log response metadata (finish reason, usage) to response_meta.jsonl.
    ResponseMeta,
    /// Enable all debug logs.
    All,
}

fn enabled(debug: &[DebugKey], required: DebugKey) -> bool {
    debug
        .iter()
        .any(|k| matches!(k, DebugKey::All) || *k == required)
}

/// Log an outgoing request body if request logging is enabled.
pub fn log_request_if_enabled(
    app: &AppState,
    session: &str,
    debug: &[DebugKey],
    request_body: &serde_json::Value,
) {
    if !enabled(debug, DebugKey::RequestLog) {
        return;
    }
    let entry = json!({
        "timestamp": now_timestamp(),
        "request": request_body,
    });
    let _ = append_jsonl_entry(&app.request_log_file(session), &entry);
}

/// Log response metadata if response-meta logging is enabled.
pub fn log_response_meta_if_enabled(
    app: &AppState,
    session: &str,
    debug: &[DebugKey],
    response_meta: &serde_json::Value,
) {
    if !enabled(debug, DebugKey::ResponseMeta) {
        return;
    }
    let entry = json!({
        "timestamp": now_timestamp(),
        "response": response_meta,
    });
    let _ = append_jsonl_entry(&app.response_meta_log_file(session), &entry);
}
