//! Output handling for the CLI.
//!
//! `OutputHandler` writes results to stdout and diagnostics to stderr, and
//! renders transcript entries for the `--log` view.

use obschat_core::context::{
    ENTRY_TYPE_MESSAGE, ENTRY_TYPE_TOOL_CALL, ENTRY_TYPE_TOOL_RESULT, TranscriptEntry,
};

/// CLI output handler. Text to stdout, diagnostics to stderr.
#[derive(Default)]
pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn result(&self, content: &str) {
        println!("{}", content);
    }

    pub fn newline(&self) {
        println!();
    }

    /// Diagnostic shown only in verbose mode.
    pub fn diagnostic(&self, message: &str) {
        if self.verbose {
            eprintln!("{}", message);
        }
    }

    /// Diagnostic always shown.
    pub fn diagnostic_always(&self, message: &str) {
        eprintln!("{}", message);
    }

    /// Render one transcript entry for the log view.
    pub fn emit_entry(&self, entry: &TranscriptEntry) {
        match entry.entry_type.as_str() {
            ENTRY_TYPE_MESSAGE => {
                self.result(&format!("[{}]", entry.from.to_uppercase()));
                self.result(&entry.content);
                self.newline();
            }
            ENTRY_TYPE_TOOL_CALL => {
                if self.verbose {
                    self.result(&format!("[TOOL CALL: {}]\n{}\n", entry.to, entry.content));
                } else {
                    let preview = truncate(&entry.content, 60);
                    self.result(&format!("[TOOL: {}] {}", entry.to, preview));
                }
            }
            ENTRY_TYPE_TOOL_RESULT => {
                if self.verbose {
                    self.result(&format!("[TOOL RESULT: {}]\n{}\n", entry.from, entry.content));
                } else {
                    self.result(&format!("  -> {}", size_label(entry.content.len())));
                }
            }
            _ => {
                if self.verbose {
                    self.result(&format!(
                        "[{}]: {}\n",
                        entry.entry_type.to_uppercase(),
                        entry.content
                    ));
                }
            }
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn size_label(size: usize) -> String {
    if size > 1024 {
        format!("{:.1}kb", size as f64 / 1024.0)
    } else {
        format!("{}b", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 60), "short");
        let long = "x".repeat(70);
        assert_eq!(truncate(&long, 60).len(), 63);
        // Multibyte content must not split a char.
        let degrees = "°".repeat(70);
        assert!(truncate(&degrees, 60).ends_with("..."));
    }

    #[test]
    fn test_size_label() {
        assert_eq!(size_label(512), "512b");
        assert_eq!(size_label(2048), "2.0kb");
    }

    #[test]
    fn test_emit_entry_does_not_panic() {
        let handler = OutputHandler::new(false);
        let entry = TranscriptEntry::builder()
            .from("user")
            .to("default")
            .content("Hello")
            .entry_type(ENTRY_TYPE_MESSAGE)
            .build();
        handler.emit_entry(&entry);

        let verbose = OutputHandler::new(true);
        let call = TranscriptEntry::builder()
            .from("default")
            .to("plan_observation")
            .content("{\"targets\":[\"25544\"]}")
            .entry_type(ENTRY_TYPE_TOOL_CALL)
            .tool_call_id("call_1")
            .build();
        verbose.emit_entry(&call);
    }
}
