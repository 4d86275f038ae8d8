//! Configuration types for obschat.
//!
//! Settings layer in three steps: built-in defaults, the global
//! `~/.obschat/config.toml`, and a per-session `local.toml`. Resolution
//! flattens the layers into a `ResolvedConfig` that the rest of the code
//! treats as plain values. Secrets may also come from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Apply `Option`-field overrides from a source struct to a target struct.
///
/// For each field name, if `$src.field` is `Some(v)`, sets `$dst.field = v`
/// (cloning as needed). Keeps config resolution free of repetitive
/// `if let Some` blocks.
macro_rules! apply_option_overrides {
    ($src:expr, $dst:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(ref v) = $src.$field {
                $dst.$field = v.clone();
            }
        )+
    };
}

/// Built-in defaults used when neither config layer sets a value.
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const MODEL: &'static str = "gpt-4o";
    pub const BASE_URL: &'static str = "https://api.openai.com/v1/chat/completions";
    pub const USERNAME: &'static str = "user";
    /// Maximum tool rounds per prompt before the loop bails out.
    pub const MAX_TOOL_ROUNDS: usize = 4;
    /// Consecutive empty responses tolerated before giving up.
    pub const MAX_EMPTY_RESPONSES: usize = 2;
    /// Most recent context messages sent with each request.
    pub const CONTEXT_KEEP_MESSAGES: usize = 40;
}

fn default_username() -> String {
    ConfigDefaults::USERNAME.to_string()
}

fn default_max_tool_rounds() -> usize {
    ConfigDefaults::MAX_TOOL_ROUNDS
}

fn default_max_empty_responses() -> usize {
    ConfigDefaults::MAX_EMPTY_RESPONSES
}

fn default_context_keep_messages() -> usize {
    ConfigDefaults::CONTEXT_KEEP_MESSAGES
}

/// Optional generation parameters forwarded verbatim to the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiParams {
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Nucleus sampling parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Frequency penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Random seed for deterministic sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ApiParams {
    /// Merge with another layer; `other` wins for every value it sets.
    pub fn merge_with(&self, other: &ApiParams) -> ApiParams {
        ApiParams {
            temperature: other.temperature.or(self.temperature),
            max_tokens: other.max_tokens.or(self.max_tokens),
            top_p: other.top_p.or(self.top_p),
            stop: other.stop.clone().or_else(|| self.stop.clone()),
            frequency_penalty: other.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: other.presence_penalty.or(self.presence_penalty),
            seed: other.seed.or(self.seed),
        }
    }
}

/// External observation-planner invocation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Executable to run; `None` disables planning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Fixed arguments prepended before the request is piped on stdin.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Global configuration (`~/.obschat/config.toml`). Every field has a
/// default so an empty or missing file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key. `None` falls back to `OBSCHAT_API_KEY` / `OPENAI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Chat-completions endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub verbose: bool,
    /// Omit tools from API requests (pure text mode).
    #[serde(default)]
    pub no_tool_calls: bool,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_max_empty_responses")]
    pub max_empty_responses: usize,
    #[serde(default = "default_context_keep_messages")]
    pub context_keep_messages: usize,
    /// Satellite catalog in three-line element format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tle_file: Option<PathBuf>,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub api: ApiParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            username: default_username(),
            verbose: false,
            no_tool_calls: false,
            max_tool_rounds: default_max_tool_rounds(),
            max_empty_responses: default_max_empty_responses(),
            context_keep_messages: default_context_keep_messages(),
            tle_file: None,
            planner: PlannerConfig::default(),
            api: ApiParams::default(),
        }
    }
}

/// Per-session overrides (`<session>/local.toml`). Everything optional;
/// unset fields fall through to the global config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_tool_calls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_rounds: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_empty_responses: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_keep_messages: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tle_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiParams>,
}

/// Fully resolved settings for one session. No optionality left except
/// values that are genuinely optional at runtime.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// `None` = keyless endpoint (e.g. a local inference server).
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub username: String,
    pub verbose: bool,
    pub no_tool_calls: bool,
    pub max_tool_rounds: usize,
    pub max_empty_responses: usize,
    pub context_keep_messages: usize,
    pub tle_file: Option<PathBuf>,
    pub planner: PlannerConfig,
    pub api: ApiParams,
}

impl Config {
    /// Flatten global config and per-session overrides, then fill gaps from
    /// the environment (`OBSCHAT_API_KEY`, `OPENAI_API_KEY`,
    /// `OBSCHAT_BASE_URL`) and built-in defaults.
    pub fn resolve(&self, local: &LocalConfig) -> ResolvedConfig {
        let mut resolved = ResolvedConfig {
            api_key: self.api_key.clone(),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| ConfigDefaults::BASE_URL.to_string()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| ConfigDefaults::MODEL.to_string()),
            username: self.username.clone(),
            verbose: self.verbose,
            no_tool_calls: self.no_tool_calls,
            max_tool_rounds: self.max_tool_rounds,
            max_empty_responses: self.max_empty_responses,
            context_keep_messages: self.context_keep_messages,
            tle_file: self.tle_file.clone(),
            planner: self.planner.clone(),
            api: self.api.clone(),
        };

        apply_option_overrides!(
            local,
            resolved,
            base_url,
            model,
            username,
            verbose,
            no_tool_calls,
            max_tool_rounds,
            max_empty_responses,
            context_keep_messages,
        );
        if let Some(key) = &local.api_key {
            resolved.api_key = Some(key.clone());
        }
        if let Some(tle) = &local.tle_file {
            resolved.tle_file = Some(tle.clone());
        }
        if let Some(api) = &local.api {
            resolved.api = resolved.api.merge_with(api);
        }

        if resolved.api_key.is_none() {
            resolved.api_key = std::env::var("OBSCHAT_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty());
        }
        if self.base_url.is_none()
            && local.base_url.is_none()
            && let Ok(url) = std::env::var("OBSCHAT_BASE_URL")
            && !url.is_empty()
        {
            resolved.base_url = url;
        }

        resolved
    }
}
