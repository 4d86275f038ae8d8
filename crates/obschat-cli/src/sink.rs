//! Terminal response sink.
//!
//! Connects the core API's event stream to the terminal: text chunks print
//! as they arrive, planner output lines print indented, diagnostics go to
//! stderr through the output handler.

use crate::output::OutputHandler;
use obschat_core::api::sink::{ResponseEvent, ResponseSink};
use obschat_core::context::ENTRY_TYPE_MESSAGE;
use std::io::{self, Write};

pub struct CliResponseSink<'a> {
    output: &'a OutputHandler,
    verbose: bool,
}

impl<'a> CliResponseSink<'a> {
    pub fn new(output: &'a OutputHandler, verbose: bool) -> Self {
        Self { output, verbose }
    }
}

impl ResponseSink for CliResponseSink<'_> {
    fn handle(&mut self, event: ResponseEvent<'_>) -> io::Result<()> {
        match event {
            ResponseEvent::TextChunk(chunk) => {
                print!("{}", chunk);
                io::stdout().flush()?;
            }
            ResponseEvent::ToolOutputLine(line) => {
                self.output.result(&format!("  | {}", line.trim_end_matches('\n')));
            }
            ResponseEvent::Diagnostic {
                message,
                verbose_only,
            } => {
                if verbose_only {
                    self.output.diagnostic(&message);
                } else {
                    self.output.diagnostic_always(&message);
                }
            }
            ResponseEvent::TranscriptEntry(entry) => {
                // The streamed reply already prints; echo only the user's
                // own message, and only when verbose.
                if self.verbose && entry.entry_type == ENTRY_TYPE_MESSAGE {
                    self.output.emit_entry(&entry);
                }
            }
            ResponseEvent::ToolStart { name } => {
                self.output.diagnostic_always(&format!("[Running {}]", name));
            }
            ResponseEvent::ToolResult { name, ok } => {
                if !ok {
                    self.output.diagnostic_always(&format!("[{} failed]", name));
                }
            }
            ResponseEvent::Finished => {
                io::stdout().flush()?;
            }
            ResponseEvent::Newline => {
                self.output.newline();
            }
            ResponseEvent::StartResponse => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_all_events_without_panic() {
        let output = OutputHandler::new(false);
        let mut sink = CliResponseSink::new(&output, false);
        sink.handle(ResponseEvent::StartResponse).unwrap();
        sink.handle(ResponseEvent::TextChunk("chunk")).unwrap();
        sink.handle(ResponseEvent::ToolStart {
            name: "plan_observation".to_string(),
        })
        .unwrap();
        sink.handle(ResponseEvent::ToolOutputLine("pass 1\n")).unwrap();
        sink.handle(ResponseEvent::ToolResult {
            name: "plan_observation".to_string(),
            ok: true,
        })
        .unwrap();
        sink.handle(ResponseEvent::Diagnostic {
            message: "quiet".to_string(),
            verbose_only: true,
        })
        .unwrap();
        sink.handle(ResponseEvent::Finished).unwrap();
        sink.handle(ResponseEvent::Newline).unwrap();
    }
}
