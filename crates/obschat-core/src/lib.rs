//! obschat-core: embeddable core for the observatory chat front-end.
//!
//! Provides session state, streaming response demultiplexing, the
//! output-to-stream bridge, and the observation planner interface.
//!
//! # Quick Start
//!
//! For most embedding use cases, use the [`Obschat`] facade:
//!
//! ```no_run
//! // Requires ~/.obschat with a config.toml (or OBSCHAT_HOME set).
//! use obschat_core::{CollectingSink, Obschat};
//! use obschat_core::api::PromptOptions;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let obschat = Obschat::load()?;
//!     let config = obschat.resolve_config("default")?;
//!     let options = PromptOptions::new(false, &[], false);
//!     let mut sink = CollectingSink::new();
//!
//!     obschat
//!         .send_prompt("default", "When can I observe the ISS?", &config, &options, &mut sink)
//!         .await?;
//!     println!("Response: {}", sink.text);
//!     Ok(())
//! }
//! ```
//!
//! For lower-level access, use the individual modules directly.

pub mod api;
pub mod bridge;
pub mod config;
pub mod context;
pub mod extract;
pub mod jsonl;
pub mod llm;
mod obschat;
pub mod planner;
pub mod state;
pub mod tle;

// Re-export the facade
pub use obschat::Obschat;

// Re-export commonly used types
pub use api::{CollectingSink, DebugKey, PromptOptions, ResponseEvent, ResponseSink};
pub use bridge::{LineStream, ProgressWriter, bridge};
pub use config::{ApiParams, Config, LocalConfig, ResolvedConfig};
pub use context::{ChatMessage, Context, TranscriptEntry};
pub use planner::{ObservationRequest, Planner, ToolInvocation};
pub use state::{AppState, StatePaths};
