//! API request building.
//!
//! Constructs the chat-completion request body, applying the generation
//! parameters from the resolved config.

use crate::api::logging::DebugKey;
use crate::config::ResolvedConfig;
use serde_json::json;

/// Options controlling one prompt invocation.
#[derive(Debug, Clone)]
pub struct PromptOptions<'a> {
    pub verbose: bool,
    pub debug: &'a [DebugKey],
    /// Omit tools from the request even when a planner is configured.
    pub no_tools: bool,
}

impl<'a> PromptOptions<'a> {
    pub fn new(verbose: bool, debug: &'a [DebugKey], no_tools: bool) -> Self {
        Self {
            verbose,
            debug,
            no_tools,
        }
    }
}

/// Build the request body, applying all API parameters from ResolvedConfig.
pub fn build_request_body(
    config: &ResolvedConfig,
    messages: &[serde_json::Value],
    tools: Option<&[serde_json::Value]>,
    stream: bool,
) -> serde_json::Value {
    let mut body = json!({
        "model": config.model,
        "messages": messages,
        "stream": stream,
    });

    if let Some(tools) = tools
        && !tools.is_empty()
    {
        body["tools"] = json!(tools);
    }

    let api = &config.api;

    if let Some(temperature) = api.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = api.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = api.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(ref stop) = api.stop {
        body["stop"] = json!(stop);
    }
    if let Some(frequency_penalty) = api.frequency_penalty {
        body["frequency_penalty"] = json!(frequency_penalty);
    }
    if let Some(presence_penalty) = api.presence_penalty {
        body["presence_penalty"] = json!(presence_penalty);
    }
    if let Some(seed) = api.seed {
        body["seed"] = json!(seed);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiParams, Config, LocalConfig};

    fn resolved_with(api: ApiParams) -> ResolvedConfig {
        let config = Config {
            api,
            ..Config::default()
        };
        config.resolve(&LocalConfig::default())
    }

    #[test]
    fn test_minimal_body() {
        let config = resolved_with(ApiParams::default());
        let messages = vec![json!({"role": "user", "content": "hi"})];
        let body = build_request_body(&config, &messages, None, true);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_tools_and_params_applied() {
        let config = resolved_with(ApiParams {
            temperature: Some(0.5),
            seed: Some(7),
            ..ApiParams::default()
        });
        let tools = vec![json!({"type": "function"})];
        let body = build_request_body(&config, &[], Some(&tools), true);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["seed"], 7);
    }

    #[test]
    fn test_empty_tools_omitted() {
        let config = resolved_with(ApiParams::default());
        let body = build_request_body(&config, &[], Some(&[]), false);
        assert!(body.get("tools").is_none());
        assert_eq!(body["stream"], false);
    }
}
