//! API module for obschat-core.
//!
//! Streaming chat-completion plumbing, decoupled from presentation through
//! the `ResponseSink` trait.

pub mod logging;
pub mod request;
pub mod send;
pub mod sink;
pub mod stream;

pub use logging::{DebugKey, log_request_if_enabled, log_response_meta_if_enabled};
pub use request::{PromptOptions, build_request_body};
pub use send::send_prompt;
pub use sink::{CollectingSink, ResponseEvent, ResponseSink};
pub use stream::{FinishReason, SseDecoder, StreamChunk, StreamDemux};
