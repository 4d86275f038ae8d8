//! Response sink abstraction for decoupling the API from presentation.
//!
//! The `ResponseSink` trait lets the API module emit events as they happen
//! without knowing whether they end up on a terminal, in a log, or in a
//! test buffer.

use crate::context::TranscriptEntry;
use std::io;

/// Events emitted while a prompt is being processed.
#[derive(Debug, Clone)]
pub enum ResponseEvent<'a> {
    /// A chunk of text content from the streaming response.
    TextChunk(&'a str),

    /// A diagnostic message.
    Diagnostic {
        message: String,
        /// If true, only show when verbose mode is enabled.
        verbose_only: bool,
    },

    /// A transcript entry worth surfacing (e.g. the echoed user message).
    TranscriptEntry(TranscriptEntry),

    /// The planner (or another tool) has started execution.
    ToolStart { name: String },

    /// One line of live tool output, terminator included except for a
    /// trailing partial line.
    ToolOutputLine(&'a str),

    /// A tool has completed execution.
    ToolResult { name: String, ok: bool },

    /// The response stream has finished.
    Finished,

    /// A newline should be emitted (typically after response completion).
    Newline,

    /// A new response is starting (resets state between tool rounds).
    StartResponse,
}

/// Handles response events during prompt processing.
///
/// Implementations own the presentation concerns; the core API stays
/// agnostic to how events are displayed.
///
/// # Example
///
/// ```
/// use obschat_core::api::sink::{ResponseSink, ResponseEvent};
/// use std::io;
///
/// struct TextOnly {
///     text: String,
/// }
///
/// impl ResponseSink for TextOnly {
///     fn handle(&mut self, event: ResponseEvent<'_>) -> io::Result<()> {
///         if let ResponseEvent::TextChunk(chunk) = event {
///             self.text.push_str(chunk);
///         }
///         Ok(())
///     }
/// }
///
/// let mut sink = TextOnly { text: String::new() };
/// sink.handle(ResponseEvent::TextChunk("Hello")).unwrap();
/// assert_eq!(sink.text, "Hello");
/// ```
pub trait ResponseSink {
    /// Handle a response event.
    fn handle(&mut self, event: ResponseEvent<'_>) -> io::Result<()>;
}

/// A sink that collects everything for programmatic use.
///
/// Useful in tests and for embedders that want the response without any
/// terminal output.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Accumulated text content from the response.
    pub text: String,
    /// Accumulated tool output lines, in arrival order.
    pub tool_output: Vec<String>,
    /// Transcript entries emitted during the interaction.
    pub entries: Vec<TranscriptEntry>,
    /// Diagnostic messages emitted.
    pub diagnostics: Vec<String>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseSink for CollectingSink {
    fn handle(&mut self, event: ResponseEvent<'_>) -> io::Result<()> {
        match event {
            ResponseEvent::TextChunk(chunk) => {
                self.text.push_str(chunk);
            }
            ResponseEvent::ToolOutputLine(line) => {
                self.tool_output.push(line.to_string());
            }
            ResponseEvent::TranscriptEntry(entry) => {
                self.entries.push(entry);
            }
            ResponseEvent::Diagnostic { message, .. } => {
                self.diagnostics.push(message);
            }
            ResponseEvent::Finished | ResponseEvent::Newline | ResponseEvent::StartResponse => {}
            ResponseEvent::ToolStart { .. } | ResponseEvent::ToolResult { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_text() {
        let mut sink = CollectingSink::new();
        sink.handle(ResponseEvent::TextChunk("The ISS ")).unwrap();
        sink.handle(ResponseEvent::TextChunk("is visible")).unwrap();
        assert_eq!(sink.text, "The ISS is visible");
    }

    #[test]
    fn test_collecting_sink_tool_output() {
        let mut sink = CollectingSink::new();
        sink.handle(ResponseEvent::ToolOutputLine("pass 1 of 3\n"))
            .unwrap();
        sink.handle(ResponseEvent::ToolOutputLine("pass 2 of 3\n"))
            .unwrap();
        assert_eq!(sink.tool_output, vec!["pass 1 of 3\n", "pass 2 of 3\n"]);
    }

    #[test]
    fn test_collecting_sink_diagnostics() {
        let mut sink = CollectingSink::new();
        sink.handle(ResponseEvent::Diagnostic {
            message: "test message".to_string(),
            verbose_only: true,
        })
        .unwrap();
        assert_eq!(sink.diagnostics.len(), 1);
        assert_eq!(sink.diagnostics[0], "test message");
    }
}
