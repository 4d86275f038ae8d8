//! Streaming response demultiplexing.
//!
//! Chat-completion responses arrive as a sequence of SSE-framed JSON chunks
//! carrying interleaved display text and tool-call fragments. This module
//! provides the wire types for those chunks, an incremental `data:`-line
//! decoder, and `StreamDemux`, which separates the two payload kinds while
//! the stream is still in flight: text deltas are surfaced immediately,
//! tool-call fragments are folded into per-index accumulators.

use crate::llm::ToolCallAccumulator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on distinct tool-call indices accepted from one response.
/// Guards accumulator memory against a malformed or hostile stream.
pub const MAX_TOOL_CALLS: usize = 100;

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    #[serde(other)]
    Other,
}

/// One incremental unit of a streamed completion response.
///
/// Every field is optional on the wire; absent fields deserialize to their
/// defaults so a minimal `{"choices":[]}` chunk is still valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token usage, typically present only on the final chunk.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// Text delta of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    /// Finish reason of the first choice, if present.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|c| c.finish_reason)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

/// A partial tool call carried by one chunk. The `index` identifies which
/// logical call the fragment belongs to; `id`, `name` and `arguments` are
/// each optional and partial.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallFragment {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Incremental decoder for `data:`-framed server-sent event lines.
///
/// Feed raw byte slices in arrival order; complete JSON payloads come back
/// out. Network packet boundaries are arbitrary, so a partial line stays
/// buffered until its terminator arrives. Lines without the `data:` prefix
/// (comments, blank keep-alives) are skipped, and everything after the
/// `[DONE]` terminator is ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one slice of raw bytes, returning the payloads it completed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();
        if self.done {
            return payloads;
        }
        self.buf.extend_from_slice(bytes);
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                self.done = true;
                break;
            }
            if !data.is_empty() {
                payloads.push(data.to_string());
            }
        }
        payloads
    }

    /// True once the `[DONE]` terminator has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Separates a chunk stream into display text and tool-call records.
///
/// Call [`absorb`](Self::absorb) for each parsed chunk as it arrives; the
/// returned text delta is ready for immediate display. Tool-call fragments
/// are folded into per-index accumulators, ordered by ascending index
/// regardless of arrival order. Every consumed chunk is retained for
/// post-hoc inspection.
#[derive(Debug, Default)]
pub struct StreamDemux {
    calls: BTreeMap<usize, ToolCallAccumulator>,
    history: Vec<StreamChunk>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    overflow_reported: bool,
}

impl StreamDemux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one chunk, returning its text delta (if any) for display.
    pub fn absorb(&mut self, chunk: StreamChunk) -> Option<String> {
        if let Some(reason) = chunk.finish_reason() {
            self.finish_reason = Some(reason);
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }
        if let Some(choice) = chunk.choices.first()
            && let Some(fragments) = &choice.delta.tool_calls
        {
            for fragment in fragments {
                if fragment.index >= MAX_TOOL_CALLS {
                    if !self.overflow_reported {
                        eprintln!(
                            "[WARN] tool call index {} exceeds limit of {}, ignoring",
                            fragment.index, MAX_TOOL_CALLS
                        );
                        self.overflow_reported = true;
                    }
                    continue;
                }
                let record = self.calls.entry(fragment.index).or_default();
                let function = fragment.function.as_ref();
                record.absorb(
                    fragment.id.as_deref(),
                    function.and_then(|f| f.name.as_deref()),
                    function.and_then(|f| f.arguments.as_deref()),
                );
            }
        }
        let text = chunk.content().filter(|t| !t.is_empty()).map(str::to_owned);
        self.history.push(chunk);
        text
    }

    /// True if any tool-call fragment has been seen so far.
    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Every chunk consumed so far, in arrival order.
    pub fn history(&self) -> &[StreamChunk] {
        &self.history
    }

    /// Finalized tool-call records in ascending index order.
    pub fn into_tool_calls(self) -> Vec<ToolCallAccumulator> {
        self.calls.into_values().collect()
    }
}
